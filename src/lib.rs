//! 身份与访问管理后端
//! 凭证校验、身份解析、路由守卫，以及角色、环境权限与角色分配的管理

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
