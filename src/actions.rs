use chrono::{DateTime, Duration, Utc};

use crate::api::rentals::ReservationRequest;
use crate::api::returns::ReturnSubmission;
use crate::api::{RentalsApi, ReturnsApi};
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, Rental, ReturnRequest};

/// Fixed hold TTL used by the rent flow, in minutes
pub const HOLD_TTL_MINUTES: i64 = 30;

/// Tolerance between the requested TTL and the expiry the backend
/// reports, covering processing latency and clock skew
const EXPIRY_SLACK_MINUTES: i64 = 2;

/// Issues the mutating calls behind the rent and return flows. Immediate
/// rental and a timed hold are one operation parameterized by TTL.
#[derive(Clone)]
pub struct ActionSubmitter {
    rentals: RentalsApi,
    returns: ReturnsApi,
}

impl ActionSubmitter {
    pub fn new(rentals: RentalsApi, returns: ReturnsApi) -> Self {
        Self { rentals, returns }
    }

    /// Place a hold on one unit. A 409 from the backend means the unit
    /// was taken in the meantime.
    pub async fn reserve(&self, item_id: &str, unit_id: &str, ttl_minutes: i64) -> AppResult<Rental> {
        if ttl_minutes <= 0 {
            return Err(AppError::Validation("hold TTL must be positive".to_string()));
        }
        let rental = self
            .rentals
            .reserve(&ReservationRequest {
                item_id,
                unit_id,
                ttl_minutes,
            })
            .await?;
        match rental.reserve_expires_at {
            Some(expiry) if is_plausible_expiry(expiry, Utc::now(), ttl_minutes) => {
                tracing::info!("hold created: rental={} expires_at={}", rental.id, expiry);
            }
            Some(expiry) => {
                tracing::warn!(
                    "hold expiry off requested ttl: rental={} expiry={} ttl_minutes={}",
                    rental.id,
                    expiry,
                    ttl_minutes
                );
            }
            None => {
                tracing::warn!("hold created without expiry: rental={}", rental.id);
            }
        }
        Ok(rental)
    }

    /// Submit a return request. Requires exactly one previously uploaded
    /// evidence photo, identified by its storage key.
    pub async fn submit_return(
        &self,
        rental_id: &str,
        user: &AuthUser,
        organization_id: &str,
        image_key: &str,
    ) -> AppResult<ReturnRequest> {
        if image_key.is_empty() {
            return Err(AppError::Validation(
                "return submission requires one uploaded photo".to_string(),
            ));
        }
        let request = self
            .returns
            .submit(&ReturnSubmission {
                rental_id,
                user_id: &user.id,
                organization_id,
                image_key,
            })
            .await?;
        tracing::info!("return submitted: request={} rental={}", request.id, rental_id);
        Ok(request)
    }
}

/// The displayed hold expiry must sit strictly past `now`, offset by
/// roughly the requested TTL.
pub fn is_plausible_expiry(expiry: DateTime<Utc>, now: DateTime<Utc>, ttl_minutes: i64) -> bool {
    let delta = expiry - now;
    if delta <= Duration::zero() {
        return false;
    }
    let drift = delta - Duration::minutes(ttl_minutes);
    drift.abs() <= Duration::minutes(EXPIRY_SLACK_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_matches_requested_ttl() {
        let now = Utc::now();
        assert!(is_plausible_expiry(now + Duration::minutes(30), now, 30));
        assert!(is_plausible_expiry(
            now + Duration::minutes(30) + Duration::seconds(40),
            now,
            30
        ));
    }

    #[test]
    fn test_expiry_in_the_past_rejected() {
        let now = Utc::now();
        assert!(!is_plausible_expiry(now - Duration::seconds(1), now, 30));
    }

    #[test]
    fn test_expiry_far_from_ttl_rejected() {
        let now = Utc::now();
        assert!(!is_plausible_expiry(now + Duration::minutes(5), now, 30));
        assert!(!is_plausible_expiry(now + Duration::hours(2), now, 30));
    }
}
