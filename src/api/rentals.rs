use serde::Serialize;

use crate::error::AppResult;
use crate::http_client::ApiClient;
use crate::models::Rental;

/// Hold/reserve request. Immediate rental and a timed hold are the same
/// underlying operation parameterized by TTL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest<'a> {
    pub item_id: &'a str,
    pub unit_id: &'a str,
    pub ttl_minutes: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MyRentalsQuery<'a> {
    organization_id: &'a str,
}

#[derive(Clone)]
pub struct RentalsApi {
    client: ApiClient,
}

impl RentalsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Create a hold on one unit. 409 means the unit is already rented
    /// or otherwise not reservable.
    pub async fn reserve(&self, request: &ReservationRequest<'_>) -> AppResult<Rental> {
        self.client
            .post_json("/rental-requests/reservations", request)
            .await
    }

    /// The signed-in user's rentals within the given organization scope
    pub async fn my_rentals(&self, organization_id: &str) -> AppResult<Vec<Rental>> {
        self.client
            .get_json_with_query("/rentals/me", &MyRentalsQuery { organization_id })
            .await
    }
}
