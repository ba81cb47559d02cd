use crate::api::QrApi;
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, QrClaim};

/// Server-side token resolution plus, for return flows, a client-side
/// organization scope check. The same physical QR is scannable by anyone,
/// so a valid token alone does not authorize staff actions: the claim's
/// organization must also fall inside the signed-in user's scope.
#[derive(Clone)]
pub struct TokenValidator {
    qr: QrApi,
}

impl TokenValidator {
    pub fn new(qr: QrApi) -> Self {
        Self { qr }
    }

    /// Resolve a token into its claim. Errors arrive pre-classified:
    /// 400 malformed, 401 expired/invalid, anything else unknown failure.
    pub async fn resolve(&self, token: &str) -> AppResult<QrClaim> {
        let claim = self.qr.resolve(token).await?;
        tracing::debug!(
            "qr resolved: type={:?} org={} expires_at={}",
            claim.token_type,
            claim.organization_id,
            claim.expires_at
        );
        Ok(claim)
    }

    /// Resolve + authorize for the return flow
    pub async fn resolve_for_return(&self, token: &str, user: &AuthUser) -> AppResult<QrClaim> {
        let claim = self.resolve(token).await?;
        Self::authorize_return(&claim, user)?;
        Ok(claim)
    }

    /// The claim's organization must equal the user's own organization id
    /// (university/college/department, selected by admin role).
    pub fn authorize_return(claim: &QrClaim, user: &AuthUser) -> AppResult<()> {
        let scoped = user.scoped_organization_id().ok_or_else(|| {
            AppError::Forbidden("user has no administrative organization scope".to_string())
        })?;
        if claim.organization_id != scoped {
            return Err(AppError::Forbidden(format!(
                "claim organization {} is outside the user's scope",
                claim.organization_id
            )));
        }
        Ok(())
    }
}
