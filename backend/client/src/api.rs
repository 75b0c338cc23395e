use payloads::{
    CreatePetitionRequest, CreatedPetitionResponse, ErrorResponse, LoginRequest, LoginResponse,
    MessageResponse, PetitionView, PetitionsResponse, RegisterRequest, RespondRequest, Status,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx reply. `message` is the server's `error` field when present.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token storage: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<MessageResponse, ClientError> {
        send(self.http.post(self.url("/petitioner/register")).json(request)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        send(self.http.post(self.url("/petitioner/login")).json(&request)).await
    }

    pub async fn petitions(
        &self,
        token: &str,
        status: Option<Status>,
    ) -> Result<Vec<PetitionView>, ClientError> {
        let mut request = self
            .http
            .get(self.url("/petitioner/petitions"))
            .bearer_auth(token);

        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }

        let response: PetitionsResponse = send(request).await?;
        Ok(response.petitions)
    }

    pub async fn create_petition(
        &self,
        token: &str,
        title: &str,
        text: &str,
    ) -> Result<CreatedPetitionResponse, ClientError> {
        let request = CreatePetitionRequest {
            title: title.to_string(),
            text: text.to_string(),
        };

        send(
            self.http
                .post(self.url("/petitioner/petitions"))
                .bearer_auth(token)
                .json(&request),
        )
        .await
    }

    pub async fn sign_petition(&self, token: &str, id: &str) -> Result<MessageResponse, ClientError> {
        send(
            self.http
                .post(self.url(&format!("/petitioner/petitions/{id}/sign")))
                .bearer_auth(token),
        )
        .await
    }

    pub async fn admin_petitions(&self, token: &str) -> Result<Vec<PetitionView>, ClientError> {
        let response: PetitionsResponse = send(
            self.http
                .get(self.url("/admin/petitions"))
                .bearer_auth(token),
        )
        .await?;

        Ok(response.petitions)
    }

    pub async fn respond(
        &self,
        token: &str,
        id: &str,
        response: &str,
    ) -> Result<MessageResponse, ClientError> {
        let request = RespondRequest {
            response: response.to_string(),
        };

        send(
            self.http
                .post(self.url(&format!("/admin/petitions/{id}/respond")))
                .bearer_auth(token)
                .json(&request),
        )
        .await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    parse(request.send().await?).await
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await?;
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|error| error.error)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
