//! Customer management: `/api/customers`.

use serde::{Deserialize, Serialize};

use crate::{ApiClient, ApiError, ResourceId};

const CUSTOMERS_PATH: &str = "/api/customers";

/// A customer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Identifier.
    pub id: ResourceId,
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: String,
}

/// Body for creating or replacing a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerForm {
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: String,
}

impl CustomerForm {
    /// Checks that every field is filled in.
    pub fn validate(&self) -> Result<(), ApiError> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Invalid(format!("missing {}", missing.join(", "))))
        }
    }
}

/// Client for `/api/customers`.
#[derive(Debug, Clone)]
pub struct CustomersApi {
    client: ApiClient,
}

impl CustomersApi {
    /// Creates the service.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Lists all customers.
    pub async fn list(&self) -> Result<Vec<Customer>, ApiError> {
        self.client.get_json(CUSTOMERS_PATH).await
    }

    /// Creates a customer. Returns the stored record when the server echoes it.
    pub async fn create(&self, form: &CustomerForm) -> Result<Option<Customer>, ApiError> {
        form.validate()?;
        self.client.post_json(CUSTOMERS_PATH, form).await
    }

    /// Replaces a customer's details. Returns the stored record when the
    /// server echoes it.
    pub async fn update(
        &self,
        id: &ResourceId,
        form: &CustomerForm,
    ) -> Result<Option<Customer>, ApiError> {
        form.validate()?;
        self.client
            .put_json(&format!("{CUSTOMERS_PATH}/{id}"), form)
            .await
    }

    /// Deletes a customer.
    pub async fn delete(&self, id: &ResourceId) -> Result<(), ApiError> {
        self.client.delete(&format!("{CUSTOMERS_PATH}/{id}")).await
    }
}
