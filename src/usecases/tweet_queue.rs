use crate::common::context::Context;
use crate::common::error::{AppError, ServiceResult, unexpected};
use crate::entities::brands::Brand;
use crate::entities::sessions::Session;
use crate::repositories::StoreError;

/// The queue of a brand is visible to its owner and to staff, and only
/// under the organization the brand belongs to.
pub async fn authorize<C: Context + ?Sized>(
    ctx: &C,
    session: &Session,
    organization_id: i64,
    brand_id: i64,
) -> ServiceResult<Brand> {
    let brand = match ctx.store().fetch_brand(brand_id).await {
        Ok(brand) => brand,
        Err(StoreError::NotFound) => return Err(AppError::BrandsNotFound),
        Err(e) => return unexpected(e),
    };
    if brand.organization_id != Some(organization_id) {
        return Err(AppError::BrandsNotFound);
    }
    if brand.owner_id != session.user_id && !session.is_staff {
        return Err(AppError::TweetQueueForbidden);
    }
    Ok(brand)
}
