pub mod app_check;
pub mod routes;
