//! CRUD services for the backend's resources.
//!
//! Every resource exposes the same five calls under `/api/{Name}`, so one
//! generic service covers Loans, Customers, Payments and Admins. All of
//! them go through `ApiClient` and end the session on a 401.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use crate::models::{Admin, Customer, Loan, Payment};

use super::{ApiClient, ApiError, ListFilter};

pub trait Resource: Serialize + DeserializeOwned + Send + Sync {
    /// Collection endpoint, e.g. `/api/Loan`
    const ENDPOINT: &'static str;
    /// Label used in logs and CLI output
    const NAME: &'static str;

    fn id(&self) -> Option<i64>;

    fn status(&self) -> Option<&str> {
        None
    }

    fn branch(&self) -> Option<&str> {
        None
    }
}

impl Resource for Loan {
    const ENDPOINT: &'static str = "/api/Loan";
    const NAME: &'static str = "loan";

    fn id(&self) -> Option<i64> {
        self.loan_id
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }
}

impl Resource for Customer {
    const ENDPOINT: &'static str = "/api/Customer";
    const NAME: &'static str = "customer";

    fn id(&self) -> Option<i64> {
        self.customer_id
    }
}

impl Resource for Payment {
    const ENDPOINT: &'static str = "/api/Payment";
    const NAME: &'static str = "payment";

    fn id(&self) -> Option<i64> {
        self.payment_id
    }

    fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }
}

impl Resource for Admin {
    const ENDPOINT: &'static str = "/api/Admin";
    const NAME: &'static str = "admin";

    fn id(&self) -> Option<i64> {
        self.admin_id
    }
}

pub struct ResourceService<'a, R> {
    api: &'a ApiClient,
    _resource: PhantomData<R>,
}

impl<'a, R: Resource> ResourceService<'a, R> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self {
            api,
            _resource: PhantomData,
        }
    }

    fn item_path(id: i64) -> String {
        format!("{}/{}", R::ENDPOINT, id)
    }

    pub async fn list(&self) -> Result<Vec<R>, ApiError> {
        let items: Option<Vec<R>> = self.api.get(R::ENDPOINT).await?;
        Ok(items.unwrap_or_default())
    }

    /// List, then narrow the result locally
    pub async fn list_filtered(&self, filter: &ListFilter) -> Result<Vec<R>, ApiError> {
        Ok(filter.apply(self.list().await?))
    }

    pub async fn get(&self, id: i64) -> Result<R, ApiError> {
        self.api.get(&Self::item_path(id)).await
    }

    /// Create a record. Backends that answer 201/204 without a body yield `None`.
    pub async fn create(&self, item: &R) -> Result<Option<R>, ApiError> {
        self.api.post(R::ENDPOINT, item).await
    }

    /// Update a record. Backends that answer 204 yield `None`.
    pub async fn update(&self, id: i64, item: &R) -> Result<Option<R>, ApiError> {
        self.api.put(&Self::item_path(id), item).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.api.delete(&Self::item_path(id)).await
    }
}

impl ApiClient {
    pub fn resource<R: Resource>(&self) -> ResourceService<'_, R> {
        ResourceService::new(self)
    }

    pub fn loans(&self) -> ResourceService<'_, Loan> {
        self.resource()
    }

    pub fn customers(&self) -> ResourceService<'_, Customer> {
        self.resource()
    }

    pub fn payments(&self) -> ResourceService<'_, Payment> {
        self.resource()
    }

    pub fn admins(&self) -> ResourceService<'_, Admin> {
        self.resource()
    }
}
