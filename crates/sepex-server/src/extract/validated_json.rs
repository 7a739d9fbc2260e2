//! JSON body extraction combined with `validator`-derived validation.

use axum::extract::{FromRequest, Request};
use axum::Json;
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::{Error, ErrorKind};

/// Deserializes a JSON body and runs its `Validate` impl before handing it to
/// the handler, so a malformed payload and a well-formed-but-invalid one both
/// fail the same way: a 400 before any scheduling-core call is made.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct ValidateJson<T>(pub T);

impl<T> ValidateJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for ValidateJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ErrorKind::BadRequest.with_message(rejection.body_text()))?;
        data.validate()?;
        Ok(Self(data))
    }
}

impl From<ValidationErrors> for Error<'static> {
    fn from(errors: ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|m| format!("{field}: {m}"))
                        .unwrap_or_else(|| format!("{field}: failed validation ({})", error.code))
                })
            })
            .collect();

        let message = if messages.is_empty() {
            "request validation failed".to_owned()
        } else {
            messages.join("; ")
        };

        ErrorKind::BadRequest.with_message(message)
    }
}

impl<T> aide::OperationInput for ValidateJson<T>
where
    T: schemars::JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        Json::<T>::inferred_early_responses(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn validation_error_renders_field_and_reason() {
        let mut payload = Payload { name: String::new() };
        payload.name = String::new();
        let err = payload.validate().unwrap_err();
        let http_err: Error<'static> = err.into();
        assert_eq!(http_err.kind(), ErrorKind::BadRequest);
    }
}
