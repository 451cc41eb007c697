pub mod extract;
pub mod jwt;
pub mod password;
pub mod pricing;
pub mod query;
pub mod response;
