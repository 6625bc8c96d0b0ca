use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_core::config::{
    draft_max_age_from_env_value, insurance_keywords_from_env_value, locale_from_env_value,
};
use booking_core::constants::DEFAULT_DRAFT_DIR;
use booking_core::validation::is_insurance_payment;
use booking_core::{
    eligible_polis_for, BookingConfig, BookingDraft, BookingResult, BookingWizard, DraftEdit,
    DraftPersistence, DraftStore, FileDraftStore, LookupState, Message, Notification,
    NotificationLevel, PatientResolver, ServiceKind, SessionContext, Step, WizardContext,
};
use booking_types::mask_identifier;
use simrs::{BookingConfirmation, HttpSimrsClient, SimrsApi};

#[derive(Parser)]
#[command(name = "simrs-booking")]
#[command(about = "Book SIMRS appointments, medical check-ups and lab visits")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List departments that can be booked for a service
    Polis {
        /// appointment, mcu or lab
        #[arg(long, default_value = "appointment")]
        service: ServiceKind,
    },
    /// List payment methods, marking insurance-related ones
    PaymentMethods,
    /// Look up a patient by medical record number or NIK
    Search {
        /// Medical record number, or a 16-digit NIK
        identifier: String,
    },
    /// Walk a draft file through the wizard and submit it, resuming any stored draft
    Book {
        /// JSON booking draft
        draft: PathBuf,
        /// Provider (doctor or unit) identifier
        #[arg(long)]
        provider: String,
        #[arg(long, default_value = "appointment")]
        service: ServiceKind,
        /// Accept the terms, privacy policy and fee information
        #[arg(long)]
        agree_all: bool,
    },
    /// Inspect or remove a stored draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    /// Print the stored draft
    Show {
        #[arg(long)]
        provider: String,
        #[arg(long, default_value = "appointment")]
        service: ServiceKind,
    },
    /// Remove the stored draft
    Clear {
        #[arg(long)]
        provider: String,
        #[arg(long, default_value = "appointment")]
        service: ServiceKind,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DraftView<'a> {
    key: &'a str,
    step: Step,
    saved_at: chrono::DateTime<chrono::Utc>,
    form_data: &'a BookingDraft,
}

/// Entry point for the booking CLI.
///
/// # Environment Variables
/// - `SIMRS_API_URL`: SIMRS REST API base URL (required)
/// - `SIMRS_API_TOKEN`: bearer token for the API (optional)
/// - `BOOKING_DRAFT_DIR`: directory for stored drafts (default: "booking_drafts")
/// - `BOOKING_INSURANCE_KEYWORDS`: comma-separated insurance payment keywords
/// - `BOOKING_DRAFT_MAX_AGE_HOURS`: hours before a stored draft expires (default: 24)
/// - `BOOKING_LOCALE`: `id` or `en` (default: "id")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simrs_booking=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Arc::new(config_from_env()?);

    match cli.command {
        Commands::Polis { service } => {
            let client = client(&config)?;
            let polis = eligible_polis_for(service, &client.list_polis().await?);
            if polis.is_empty() {
                println!("No departments available for {service}.");
            }
            for poli in polis {
                println!("{}\t{}", poli.code, poli.name);
            }
        }
        Commands::PaymentMethods => {
            let client = client(&config)?;
            for method in client.list_payment_methods().await? {
                let marker = if is_insurance_payment(Some(&method), config.insurance_keywords()) {
                    "\t[insurance]"
                } else {
                    ""
                };
                println!("{}\t{}{}", method.code, method.label, marker);
            }
        }
        Commands::Search { identifier } => {
            search(&config, &client(&config)?, &identifier).await?;
        }
        Commands::Book {
            draft,
            provider,
            service,
            agree_all,
        } => {
            let client = client(&config)?;
            book(config, &client, draft, provider, service, agree_all).await?;
        }
        Commands::Draft { action } => match action {
            DraftAction::Show { provider, service } => {
                let persistence = draft_persistence(&config, service, &provider);
                match persistence.load() {
                    Some(restored) => {
                        let view = DraftView {
                            key: persistence.key(),
                            step: restored.step,
                            saved_at: restored.saved_at,
                            form_data: &restored.draft,
                        };
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    }
                    None => println!("No stored draft for {service} / {provider}."),
                }
            }
            DraftAction::Clear { provider, service } => {
                let persistence = draft_persistence(&config, service, &provider);
                persistence.clear();
                println!("Cleared draft {}.", persistence.key());
            }
        },
    }

    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn config_from_env() -> anyhow::Result<BookingConfig> {
    let api_base_url = env_value("SIMRS_API_URL").context("SIMRS_API_URL must be set")?;
    let draft_dir = env_value("BOOKING_DRAFT_DIR")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DRAFT_DIR));

    let config = BookingConfig::new(
        api_base_url,
        env_value("SIMRS_API_TOKEN"),
        draft_dir,
        insurance_keywords_from_env_value(env_value("BOOKING_INSURANCE_KEYWORDS")),
        draft_max_age_from_env_value(env_value("BOOKING_DRAFT_MAX_AGE_HOURS"))?,
        locale_from_env_value(env_value("BOOKING_LOCALE"))?,
    )?;
    tracing::debug!("booking config resolved: {:?}", config.draft_dir());
    Ok(config)
}

fn client(config: &BookingConfig) -> anyhow::Result<HttpSimrsClient> {
    Ok(HttpSimrsClient::new(
        config.api_base_url(),
        config.api_token().map(str::to_string),
    )?)
}

fn draft_persistence(
    config: &BookingConfig,
    service: ServiceKind,
    provider: &str,
) -> DraftPersistence<FileDraftStore> {
    DraftPersistence::new(
        FileDraftStore::new(config.draft_dir()),
        DraftPersistence::<FileDraftStore>::key_for(service, provider),
        config.draft_max_age(),
    )
}

async fn search(
    config: &BookingConfig,
    client: &HttpSimrsClient,
    identifier: &str,
) -> anyhow::Result<()> {
    let locale = config.locale();
    let mut resolver = PatientResolver::new();
    let ticket = match resolver.begin(identifier) {
        Ok(ticket) => ticket,
        Err(issue) => bail!(Message::Validation(&issue).render(locale)),
    };
    tracing::info!(
        "searching {} by {:?}",
        mask_identifier(ticket.identifier()),
        ticket.strategy()
    );

    let result = PatientResolver::fetch(client, &ticket).await;
    resolver.complete(&ticket, result);

    match resolver.state() {
        LookupState::Found { patient, .. } => {
            println!("{}", Message::PatientFound { name: &patient.full_name }.render(locale));
            println!("RM:         {}", patient.mr_number);
            if let Some(nik) = &patient.nik {
                println!("NIK:        {}", mask_identifier(nik));
            }
            if let Some(gender) = patient.gender {
                println!("Gender:     {}", gender.to_wire());
            }
            if let Some(birth_date) = patient.birth_date {
                println!("Birth date: {birth_date}");
            }
            if let Some(phone) = &patient.phone {
                println!("Phone:      {phone}");
            }
        }
        LookupState::NotFound { server_message, .. } => {
            println!(
                "{}",
                Message::PatientNotFound {
                    server: server_message.as_deref()
                }
                .render(locale)
            );
        }
        LookupState::Failed { detail, .. } => {
            bail!("{} ({detail})", Message::LookupFailed.render(locale));
        }
        LookupState::Idle | LookupState::Loading { .. } => {
            bail!("lookup did not complete");
        }
    }
    Ok(())
}

async fn book(
    config: Arc<BookingConfig>,
    client: &HttpSimrsClient,
    draft_path: PathBuf,
    provider: String,
    service: ServiceKind,
    agree_all: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&draft_path)
        .with_context(|| format!("failed to read draft {}", draft_path.display()))?;
    let draft: BookingDraft = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid booking draft", draft_path.display()))?;

    let catalog = client.list_polis().await?;
    let context = WizardContext::new(service, provider)
        .with_eligible_polis(eligible_polis_for(service, &catalog));

    let session = SessionContext::anonymous(config.locale());
    let store = FileDraftStore::new(config.draft_dir());
    let mut wizard = BookingWizard::open(client, store, config, session, context).await;
    wizard.merge(draft)?;
    if agree_all {
        for edit in [
            DraftEdit::ConsentTerms(true),
            DraftEdit::ConsentPrivacy(true),
            DraftEdit::ConsentFee(true),
        ] {
            wizard.apply(edit)?;
        }
    }

    let outcome = drive(&mut wizard).await;
    print_notifications(wizard.take_notifications());

    let confirmation = outcome.map_err(|err| {
        let summary = if err.is_remote() {
            "SIMRS refused the request"
        } else {
            "booking stopped before submission"
        };
        anyhow::Error::new(err).context(summary)
    })?;
    println!("Booking code: {}", confirmation.booking_code);
    if let Some(message) = &confirmation.message {
        println!("{message}");
    }
    Ok(())
}

async fn drive<A: SimrsApi, S: DraftStore>(
    wizard: &mut BookingWizard<A, S>,
) -> BookingResult<BookingConfirmation> {
    while wizard.step() != Step::Confirmation {
        wizard.advance().await?;
    }
    wizard.submit().await
}

fn print_notifications(notifications: Vec<Notification>) {
    for notification in notifications {
        match notification.level {
            NotificationLevel::Error => eprintln!("error: {}", notification.message),
            NotificationLevel::Success | NotificationLevel::Info => {
                println!("{}", notification.message)
            }
        }
    }
}
