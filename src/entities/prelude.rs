pub use super::documents::Entity as Documents;
pub use super::users::Entity as Users;
