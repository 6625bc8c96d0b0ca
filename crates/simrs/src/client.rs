//! HTTP access to the SIMRS REST API.
//!
//! [`SimrsApi`] is the seam the booking core depends on; [`HttpSimrsClient`] implements it with
//! `reqwest`. No request timeout is configured: calls resolve or fail according to the
//! transport's defaults.

use crate::booking::{Booking, BookingConfirmation, BookingRequest};
use crate::catalog::{Catalog, PaymentMethod, Poli};
use crate::patient::{PatientSearch, PatientSearchOutcome};
use crate::{SimrsError, SimrsResult};
use booking_types::mask_identifier;
use reqwest::{StatusCode, Url};

/// Header carrying the per-session correlation id on booking submissions.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Operations the booking core needs from SIMRS.
#[allow(async_fn_in_trait)]
pub trait SimrsApi {
    /// `GET /appointments/search-patient/{mr_number}`
    async fn search_patient_by_mr(&self, mr_number: &str) -> SimrsResult<PatientSearchOutcome>;

    /// `GET /appointments/search-patient-nik/{nik}`
    async fn search_patient_by_nik(&self, nik: &str) -> SimrsResult<PatientSearchOutcome>;

    /// `POST /appointments`
    async fn create_appointment(
        &self,
        request: &BookingRequest,
        request_id: &str,
    ) -> SimrsResult<BookingConfirmation>;

    /// `GET /appointments/polis`
    async fn list_polis(&self) -> SimrsResult<Vec<Poli>>;

    /// `GET /appointments/payment-methods`
    async fn list_payment_methods(&self) -> SimrsResult<Vec<PaymentMethod>>;
}

impl<T: SimrsApi + ?Sized> SimrsApi for &T {
    async fn search_patient_by_mr(&self, mr_number: &str) -> SimrsResult<PatientSearchOutcome> {
        (**self).search_patient_by_mr(mr_number).await
    }

    async fn search_patient_by_nik(&self, nik: &str) -> SimrsResult<PatientSearchOutcome> {
        (**self).search_patient_by_nik(nik).await
    }

    async fn create_appointment(
        &self,
        request: &BookingRequest,
        request_id: &str,
    ) -> SimrsResult<BookingConfirmation> {
        (**self).create_appointment(request, request_id).await
    }

    async fn list_polis(&self) -> SimrsResult<Vec<Poli>> {
        (**self).list_polis().await
    }

    async fn list_payment_methods(&self) -> SimrsResult<Vec<PaymentMethod>> {
        (**self).list_payment_methods().await
    }
}

/// `reqwest`-backed SIMRS client.
#[derive(Clone, Debug)]
pub struct HttpSimrsClient {
    http: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpSimrsClient {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SimrsError::InvalidInput`] if the URL does not parse, is not http(s), or cannot
    /// carry a path; [`SimrsError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_token: Option<String>) -> SimrsResult<Self> {
        let cleaned = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(cleaned)
            .map_err(|e| SimrsError::InvalidInput(format!("invalid SIMRS URL '{cleaned}': {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SimrsError::InvalidInput(format!(
                "SIMRS URL must use http or https, got: {}",
                parsed.scheme()
            )));
        }
        if parsed.cannot_be_a_base() {
            return Err(SimrsError::InvalidInput(format!(
                "SIMRS URL cannot be used as a base: {cleaned}"
            )));
        }

        let http = reqwest::Client::builder().build()?;
        tracing::debug!("SIMRS client created for {}", parsed);

        Ok(Self {
            http,
            base_url: parsed,
            api_token: api_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Build an endpoint URL under the base path. Segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> SimrsResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SimrsError::InvalidInput("SIMRS URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorise(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_text(&self, url: Url) -> SimrsResult<(StatusCode, String)> {
        let response = self.authorise(self.http.get(url)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn search(&self, route: &str, identifier: &str) -> SimrsResult<PatientSearchOutcome> {
        let url = self.endpoint(&["appointments", route, identifier])?;
        tracing::info!(
            "SIMRS patient search via {} for {}",
            route,
            mask_identifier(identifier)
        );

        let (status, body) = self.get_text(url).await?;
        if status.is_success() {
            return PatientSearch::parse(&body);
        }
        if status == StatusCode::NOT_FOUND {
            // Some gateways answer a miss with 404 and the regular `{found:false}` body.
            return match PatientSearch::parse(&body) {
                Ok(outcome @ PatientSearchOutcome::NotFound { .. }) => Ok(outcome),
                _ => Ok(PatientSearchOutcome::NotFound {
                    message: Booking::error_message(&body),
                }),
            };
        }

        Err(SimrsError::Status {
            status: status.as_u16(),
            message: Booking::error_message(&body),
        })
    }

    async fn get_list<T>(
        &self,
        route: &str,
        parse: fn(&str) -> SimrsResult<Vec<T>>,
    ) -> SimrsResult<Vec<T>> {
        let url = self.endpoint(&["appointments", route])?;
        let (status, body) = self.get_text(url).await?;
        if !status.is_success() {
            return Err(SimrsError::Status {
                status: status.as_u16(),
                message: Booking::error_message(&body),
            });
        }
        parse(&body)
    }
}

impl SimrsApi for HttpSimrsClient {
    async fn search_patient_by_mr(&self, mr_number: &str) -> SimrsResult<PatientSearchOutcome> {
        self.search("search-patient", mr_number).await
    }

    async fn search_patient_by_nik(&self, nik: &str) -> SimrsResult<PatientSearchOutcome> {
        self.search("search-patient-nik", nik).await
    }

    async fn create_appointment(
        &self,
        request: &BookingRequest,
        request_id: &str,
    ) -> SimrsResult<BookingConfirmation> {
        let url = self.endpoint(&["appointments"])?;
        let builder = self
            .http
            .post(url)
            .header(REQUEST_ID_HEADER, request_id)
            .json(request);

        let response = self.authorise(builder).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Booking::parse_confirmation(&body);
        }

        Err(SimrsError::Status {
            status: status.as_u16(),
            message: Booking::error_message(&body),
        })
    }

    async fn list_polis(&self) -> SimrsResult<Vec<Poli>> {
        self.get_list("polis", Catalog::parse_polis).await
    }

    async fn list_payment_methods(&self) -> SimrsResult<Vec<PaymentMethod>> {
        self.get_list("payment-methods", Catalog::parse_payment_methods)
            .await
    }
}
