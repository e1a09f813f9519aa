pub mod catalog;
pub mod checkout;
pub mod designs;
pub mod discounts;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod settings;
pub mod templates;
