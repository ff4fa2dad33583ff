pub mod employee_login;
pub mod federated_login;
