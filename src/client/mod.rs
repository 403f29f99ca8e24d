//! 店面前端的搜索客户端：接口、防抖、状态与控制器

pub mod api;
pub mod controller;
pub mod debounce;
pub mod state;
