//! Authorization decisions for every ownership-scoped operation.
//!
//! Each function is pure: the caller loads whatever records are needed and
//! the policy answers allow/deny (or the scope a listing is limited to). The
//! services turn a denial into `AppError::Forbidden`.

use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::entities::{booking, comment, promotion, rental_car_provider, user};
use crate::error::{AppError, AppResult};

/// The authenticated caller, resolved from the session token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: user::Model,
}

impl AuthContext {
    pub fn new(user: user::Model) -> Self {
        Self { user }
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == UserRole::Admin
    }

    fn owns(&self, provider: &rental_car_provider::Model) -> bool {
        self.user.role == UserRole::Provider && provider.user_id == self.user.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    fn deny(actor: &AuthContext, action: &str) -> Self {
        Decision::Deny(format!(
            "User {} is not authorized to {}",
            actor.id(),
            action
        ))
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> AppResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(message) => Err(AppError::Forbidden(message)),
        }
    }
}

/// Role-gate predicate: `role` must be one of `allowed`.
pub fn role_allowed(role: UserRole, allowed: &[UserRole]) -> bool {
    allowed.contains(&role)
}

/// Update/delete of a provider record: admin, or the provider account that owns it.
pub fn can_manage_provider(
    actor: &AuthContext,
    provider: &rental_car_provider::Model,
    action: &str,
) -> Decision {
    if actor.is_admin() || actor.owns(provider) {
        Decision::Allow
    } else {
        Decision::deny(actor, action)
    }
}

/// Creating, updating or deleting a car listed under `provider`.
pub fn can_manage_car(
    actor: &AuthContext,
    provider: &rental_car_provider::Model,
    action: &str,
) -> Decision {
    can_manage_provider(actor, provider, action)
}

/// Provider accounts may only book against their own provider record.
pub fn can_book_with(actor: &AuthContext, provider: &rental_car_provider::Model) -> Decision {
    match actor.role() {
        UserRole::Provider if !actor.owns(provider) => {
            Decision::deny(actor, "add a booking to this rental car provider")
        }
        _ => Decision::Allow,
    }
}

/// Read, update or delete of a booking: the booking's user, the owning provider, or admin.
pub fn can_access_booking(
    actor: &AuthContext,
    booking: &booking::Model,
    provider: Option<&rental_car_provider::Model>,
    action: &str,
) -> Decision {
    if actor.is_admin()
        || booking.user_id == actor.id()
        || provider.is_some_and(|p| actor.owns(p))
    {
        Decision::Allow
    } else {
        Decision::deny(actor, action)
    }
}

/// Converting a booking into a booked-car entry: its user or admin.
pub fn can_finish_booking(actor: &AuthContext, booking: &booking::Model) -> Decision {
    if actor.is_admin() || booking.user_id == actor.id() {
        Decision::Allow
    } else {
        Decision::deny(actor, "finish this booking")
    }
}

/// Filters applied to a booking listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookingScope {
    pub user_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
}

/// Admins see everything, providers their own provider's bookings, users their own.
pub fn booking_scope(
    actor: &AuthContext,
    own_provider: Option<Uuid>,
    requested_provider: Option<Uuid>,
) -> AppResult<BookingScope> {
    match actor.role() {
        UserRole::Admin => Ok(BookingScope {
            user_id: None,
            provider_id: requested_provider,
        }),
        UserRole::Provider => {
            let own = own_provider.ok_or_else(|| {
                AppError::Forbidden(format!(
                    "User {} has not registered a rental car provider",
                    actor.id()
                ))
            })?;
            match requested_provider {
                Some(requested) if requested != own => Err(AppError::Forbidden(format!(
                    "User {} is not authorized to view bookings of this rental car provider",
                    actor.id()
                ))),
                _ => Ok(BookingScope {
                    user_id: None,
                    provider_id: Some(own),
                }),
            }
        }
        UserRole::User => Ok(BookingScope {
            user_id: Some(actor.id()),
            provider_id: requested_provider,
        }),
    }
}

/// Only renters who finished a rental of the car (or admins) may review it.
pub fn can_comment(actor: &AuthContext, has_completed_booking: bool, has_booked_car: bool) -> Decision {
    if actor.is_admin() || has_completed_booking || has_booked_car {
        Decision::Allow
    } else {
        Decision::Deny(format!(
            "User {} cannot comment on a car they have not rented",
            actor.id()
        ))
    }
}

pub fn can_update_comment(actor: &AuthContext, comment: &comment::Model) -> Decision {
    if comment.user_id == actor.id() {
        Decision::Allow
    } else {
        Decision::deny(actor, "update this comment")
    }
}

pub fn can_delete_comment(actor: &AuthContext, comment: &comment::Model) -> Decision {
    if actor.is_admin() || comment.user_id == actor.id() {
        Decision::Allow
    } else {
        Decision::deny(actor, "delete this comment")
    }
}

/// Update/delete of a promotion: admin, or the provider it is scoped to.
pub fn can_manage_promotion(
    actor: &AuthContext,
    promotion: &promotion::Model,
    own_provider: Option<Uuid>,
    action: &str,
) -> Decision {
    match actor.role() {
        UserRole::Admin => Decision::Allow,
        UserRole::Provider
            if own_provider.is_some() && promotion.provider_id == own_provider =>
        {
            Decision::Allow
        }
        _ => Decision::deny(actor, action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::BookingStatus;
    use chrono::Utc;

    fn account(role: UserRole) -> AuthContext {
        AuthContext::new(user::Model {
            id: Uuid::new_v4(),
            name: "Someone".to_string(),
            telephone_number: "0800000000".to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: String::new(),
            role,
            image: None,
            my_rcp_id: None,
            created_at: Utc::now().into(),
        })
    }

    fn provider_of(owner: &AuthContext) -> rental_car_provider::Model {
        rental_car_provider::Model {
            id: Uuid::new_v4(),
            user_id: owner.id(),
            name: "Fast Wheels".to_string(),
            address: "1 Main Rd".to_string(),
            district: "Pathum Wan".to_string(),
            province: "Bangkok".to_string(),
            postal_code: "10330".to_string(),
            tel: None,
            region: "Central".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn booking_for(user: &AuthContext, provider: &rental_car_provider::Model) -> booking::Model {
        let now = Utc::now();
        booking::Model {
            id: Uuid::new_v4(),
            user_id: user.id(),
            rental_car_provider_id: provider.id,
            car_id: None,
            promotion_id: None,
            start_date: now.into(),
            end_date: now.into(),
            total_price: 0.0,
            status: BookingStatus::Pending,
            created_at: now.into(),
        }
    }

    #[test]
    fn test_role_gate() {
        assert!(role_allowed(UserRole::Admin, &[UserRole::Admin, UserRole::Provider]));
        assert!(!role_allowed(UserRole::User, &[UserRole::Admin, UserRole::Provider]));
    }

    #[test]
    fn test_provider_management() {
        let owner = account(UserRole::Provider);
        let other = account(UserRole::Provider);
        let admin = account(UserRole::Admin);
        let user = account(UserRole::User);
        let provider = provider_of(&owner);

        assert!(can_manage_provider(&owner, &provider, "update").is_allowed());
        assert!(can_manage_provider(&admin, &provider, "update").is_allowed());
        assert!(!can_manage_provider(&other, &provider, "update").is_allowed());
        assert!(!can_manage_car(&user, &provider, "delete this car").is_allowed());
    }

    #[test]
    fn test_denial_names_the_actor() {
        let other = account(UserRole::Provider);
        let provider = provider_of(&account(UserRole::Provider));
        match can_manage_car(&other, &provider, "update this car") {
            Decision::Deny(message) => assert!(message.contains(&other.id().to_string())),
            Decision::Allow => panic!("expected denial"),
        }
    }

    #[test]
    fn test_booking_access() {
        let owner = account(UserRole::Provider);
        let provider = provider_of(&owner);
        let renter = account(UserRole::User);
        let stranger = account(UserRole::User);
        let rival = account(UserRole::Provider);
        let booking = booking_for(&renter, &provider);

        assert!(can_access_booking(&renter, &booking, Some(&provider), "update").is_allowed());
        assert!(can_access_booking(&owner, &booking, Some(&provider), "update").is_allowed());
        assert!(can_access_booking(&account(UserRole::Admin), &booking, None, "update").is_allowed());
        assert!(!can_access_booking(&stranger, &booking, Some(&provider), "update").is_allowed());
        assert!(!can_access_booking(&rival, &booking, Some(&provider), "update").is_allowed());

        assert!(can_finish_booking(&renter, &booking).is_allowed());
        assert!(!can_finish_booking(&owner, &booking).is_allowed());
    }

    #[test]
    fn test_providers_only_book_their_own() {
        let owner = account(UserRole::Provider);
        let provider = provider_of(&owner);
        assert!(can_book_with(&owner, &provider).is_allowed());
        assert!(!can_book_with(&account(UserRole::Provider), &provider).is_allowed());
        assert!(can_book_with(&account(UserRole::User), &provider).is_allowed());
    }

    #[test]
    fn test_booking_scope() {
        let admin = account(UserRole::Admin);
        let requested = Uuid::new_v4();
        assert_eq!(
            booking_scope(&admin, None, Some(requested)).unwrap(),
            BookingScope { user_id: None, provider_id: Some(requested) }
        );

        let user = account(UserRole::User);
        assert_eq!(
            booking_scope(&user, None, None).unwrap(),
            BookingScope { user_id: Some(user.id()), provider_id: None }
        );

        let provider = account(UserRole::Provider);
        let own = Uuid::new_v4();
        assert_eq!(
            booking_scope(&provider, Some(own), None).unwrap(),
            BookingScope { user_id: None, provider_id: Some(own) }
        );
        assert!(matches!(
            booking_scope(&provider, Some(own), Some(requested)),
            Err(AppError::Forbidden(_))
        ));
        assert!(booking_scope(&provider, None, None).is_err());
    }

    #[test]
    fn test_comment_rules() {
        let user = account(UserRole::User);
        assert!(!can_comment(&user, false, false).is_allowed());
        assert!(can_comment(&user, true, false).is_allowed());
        assert!(can_comment(&user, false, true).is_allowed());
        assert!(can_comment(&account(UserRole::Admin), false, false).is_allowed());

        let comment = comment::Model {
            id: Uuid::new_v4(),
            user_id: user.id(),
            car_id: Uuid::new_v4(),
            comment: "Smooth ride".to_string(),
            rating: 5,
            created_at: Utc::now().into(),
        };
        let admin = account(UserRole::Admin);
        assert!(can_update_comment(&user, &comment).is_allowed());
        assert!(!can_update_comment(&admin, &comment).is_allowed());
        assert!(can_delete_comment(&admin, &comment).is_allowed());
        assert!(!can_delete_comment(&account(UserRole::User), &comment).is_allowed());
    }

    #[test]
    fn test_promotion_management() {
        let provider = account(UserRole::Provider);
        let own = Uuid::new_v4();
        let now = Utc::now();
        let mut promotion = promotion::Model {
            id: Uuid::new_v4(),
            provider_id: Some(own),
            title: "Summer".to_string(),
            description: None,
            discount_percentage: 10.0,
            max_discount_amount: 500.0,
            min_purchase_amount: 0.0,
            amount: 10,
            start_date: now.into(),
            end_date: now.into(),
            created_at: now.into(),
        };

        assert!(can_manage_promotion(&provider, &promotion, Some(own), "update").is_allowed());
        assert!(!can_manage_promotion(&provider, &promotion, Some(Uuid::new_v4()), "update").is_allowed());
        assert!(!can_manage_promotion(&provider, &promotion, None, "update").is_allowed());

        promotion.provider_id = None;
        assert!(!can_manage_promotion(&provider, &promotion, Some(own), "update").is_allowed());
        assert!(can_manage_promotion(&account(UserRole::Admin), &promotion, None, "update").is_allowed());
    }
}
