//! SeaORM entity definitions for the Vigil schema

pub mod api_keys;
pub mod organizations;
pub mod password_reset_tokens;
pub mod permissions;
pub mod rate_limits;
pub mod refresh_tokens;
pub mod role_permissions;
pub mod roles;
pub mod user_roles;
pub mod users;

// Aliased re-exports so repositories can write `Users::find()` while
// still reaching columns through the module path.
pub use api_keys::{ActiveModel as ApiKeyActiveModel, Column as ApiKeyColumn, Entity as ApiKeys, Model as ApiKey};
pub use organizations::{
    ActiveModel as OrganizationActiveModel, Column as OrganizationColumn, Entity as Organizations,
    Model as Organization,
};
pub use password_reset_tokens::{
    ActiveModel as PasswordResetTokenActiveModel, Column as PasswordResetTokenColumn,
    Entity as PasswordResetTokens, Model as PasswordResetToken,
};
pub use permissions::{
    ActiveModel as PermissionActiveModel, Column as PermissionColumn, Entity as Permissions, Model as Permission,
};
pub use rate_limits::{ActiveModel as RateLimitActiveModel, Column as RateLimitColumn, Entity as RateLimits, Model as RateLimit};
pub use refresh_tokens::{
    ActiveModel as RefreshTokenActiveModel, Column as RefreshTokenColumn, Entity as RefreshTokens,
    Model as RefreshToken,
};
pub use role_permissions::{
    ActiveModel as RolePermissionActiveModel, Column as RolePermissionColumn, Entity as RolePermissions,
    Model as RolePermission,
};
pub use roles::{ActiveModel as RoleActiveModel, Column as RoleColumn, Entity as Roles, Model as Role};
pub use user_roles::{ActiveModel as UserRoleActiveModel, Column as UserRoleColumn, Entity as UserRoles, Model as UserRole};
pub use users::{ActiveModel as UserActiveModel, Column as UserColumn, Entity as Users, Model as User};
