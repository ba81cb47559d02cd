use async_trait::async_trait;

use crate::actions::{ActionSubmitter, HOLD_TTL_MINUTES};
use crate::api::{ItemsApi, RentalsApi};
use crate::error::AppResult;
use crate::models::{AuthUser, Item, QrClaim, Rental, ReturnRequest};
use crate::qr::TokenValidator;

/// What a session flow needs from the backend. The machine drives these
/// three calls in order; implementations decide scope and authorization.
#[async_trait]
pub trait FlowBackend: Send + Sync {
    type Entry: Clone + Send + Sync;
    type Input: Send + Sync;
    type Outcome: Clone + Send + Sync;

    /// Resolve the scanned token, applying any flow-specific
    /// authorization on top of server validity
    async fn validate(&self, token: &str, user: &AuthUser) -> AppResult<QrClaim>;

    /// List the entries shown for this claim's organization scope
    async fn fetch_entries(&self, claim: &QrClaim, user: &AuthUser) -> AppResult<Vec<Self::Entry>>;

    /// Dispatch the mutating action for the selected entry
    async fn submit(
        &self,
        claim: &QrClaim,
        user: &AuthUser,
        entry: &Self::Entry,
        input: &Self::Input,
    ) -> AppResult<Self::Outcome>;
}

/// Unit choice confirmed on the item detail screen
#[derive(Debug, Clone)]
pub struct RentSelection {
    pub unit_id: String,
    pub ttl_minutes: i64,
}

impl RentSelection {
    pub fn hold(unit_id: &str) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            ttl_minutes: HOLD_TTL_MINUTES,
        }
    }
}

/// Rent flow: any signed-in student may act on a valid token
pub struct RentFlow {
    validator: TokenValidator,
    items: ItemsApi,
    actions: ActionSubmitter,
}

impl RentFlow {
    pub fn new(validator: TokenValidator, items: ItemsApi, actions: ActionSubmitter) -> Self {
        Self {
            validator,
            items,
            actions,
        }
    }
}

#[async_trait]
impl FlowBackend for RentFlow {
    type Entry = Item;
    type Input = RentSelection;
    type Outcome = Rental;

    async fn validate(&self, token: &str, _user: &AuthUser) -> AppResult<QrClaim> {
        self.validator.resolve(token).await
    }

    async fn fetch_entries(&self, claim: &QrClaim, _user: &AuthUser) -> AppResult<Vec<Item>> {
        self.items.list(&claim.organization_id).await
    }

    async fn submit(
        &self,
        _claim: &QrClaim,
        _user: &AuthUser,
        entry: &Item,
        input: &RentSelection,
    ) -> AppResult<Rental> {
        self.actions
            .reserve(&entry.id, &input.unit_id, input.ttl_minutes)
            .await
    }
}

/// Storage key of the uploaded evidence photo
#[derive(Debug, Clone)]
pub struct ReturnEvidence {
    pub image_key: String,
}

/// Return flow: the claim's organization must additionally match the
/// signed-in user's own scope before anything is listed
pub struct ReturnFlow {
    validator: TokenValidator,
    rentals: RentalsApi,
    actions: ActionSubmitter,
}

impl ReturnFlow {
    pub fn new(validator: TokenValidator, rentals: RentalsApi, actions: ActionSubmitter) -> Self {
        Self {
            validator,
            rentals,
            actions,
        }
    }
}

#[async_trait]
impl FlowBackend for ReturnFlow {
    type Entry = Rental;
    type Input = ReturnEvidence;
    type Outcome = ReturnRequest;

    async fn validate(&self, token: &str, user: &AuthUser) -> AppResult<QrClaim> {
        self.validator.resolve_for_return(token, user).await
    }

    async fn fetch_entries(&self, claim: &QrClaim, _user: &AuthUser) -> AppResult<Vec<Rental>> {
        let rentals = self.rentals.my_rentals(&claim.organization_id).await?;
        Ok(rentals.into_iter().filter(Rental::is_returnable).collect())
    }

    async fn submit(
        &self,
        claim: &QrClaim,
        user: &AuthUser,
        entry: &Rental,
        input: &ReturnEvidence,
    ) -> AppResult<ReturnRequest> {
        self.actions
            .submit_return(&entry.id, user, &claim.organization_id, &input.image_key)
            .await
    }
}
