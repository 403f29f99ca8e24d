//! # Storefront
//!
//! 商品目录与搜索服务，按分层组织：
//! - `app`: 目录与搜索的处理器、模型、服务
//! - `core`: 统一错误、中间件、响应结构
//! - `infrastructure`: 配置、日志、商品数据源
//! - `client`: 店面前端的搜索控制器

pub mod app;
pub mod client;
pub mod core;
pub mod infrastructure;
pub mod server;
