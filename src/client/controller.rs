//! 搜索控制器
//!
//! 单个任务串行处理三类输入：视图命令、防抖提交、后台请求结果。
//! 每个搜索请求带单调递增的序号，序号不大于已应用序号的响应直接丢弃，
//! 所以视图只会显示最新一次激活搜索的结果。

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::api::{ClientError, SearchApi};
use super::debounce::{Debounced, Debouncer};
use super::state::{sorted_categories, visible_products, Phase, SearchState, ViewSnapshot};
use crate::app::catalog::model::{Category, Product, StorefrontPage};
use crate::app::search::model::SearchQuery;
use crate::infrastructure::config::ClientConfig;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub refresh_categories_on_load: bool,
    pub empty_results_fall_back_to_catalog: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ControllerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            min_query_len: config.min_query_len,
            refresh_categories_on_load: config.refresh_categories_on_load,
            empty_results_fall_back_to_catalog: config.empty_results_fall_back_to_catalog,
        }
    }
}

#[derive(Debug)]
enum Command {
    Input(String),
    SelectCategory(Option<String>),
    Shutdown,
}

enum Event {
    SearchResolved {
        seq: u64,
        outcome: Result<Vec<Product>, ClientError>,
    },
    CategoriesLoaded(Result<Vec<Category>, ClientError>),
}

/// 视图持有的命令句柄
#[derive(Debug, Clone)]
pub struct SearchHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SearchHandle {
    /// 输入框内容变化，返回控制器是否仍在运行
    pub fn input(&self, text: impl Into<String>) -> bool {
        self.tx.send(Command::Input(text.into())).is_ok()
    }

    /// 选择分类，`None` 或空串表示全部
    pub fn select_category(&self, category: Option<String>) -> bool {
        self.tx.send(Command::SelectCategory(category)).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

pub struct SearchController<A: SearchApi> {
    api: Arc<A>,
    config: ControllerConfig,
    catalog: Vec<Product>,
    categories: Vec<Category>,
    state: SearchState,
    debouncer: Debouncer<String>,
    commits: mpsc::UnboundedReceiver<Debounced<String>>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    view: watch::Sender<ViewSnapshot>,
    /// 最近发出的请求序号
    issued: u64,
    /// 不大于该序号的响应一律丢弃
    applied: u64,
}

impl<A: SearchApi> SearchController<A> {
    /// 以首屏数据作为初始目录和分类
    pub fn new(
        api: Arc<A>,
        config: ControllerConfig,
        page: StorefrontPage,
    ) -> (Self, SearchHandle, watch::Receiver<ViewSnapshot>) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (debouncer, commits) = Debouncer::new(config.debounce);

        let catalog = page.products;
        let categories = sorted_categories(page.categories);
        let state = SearchState::default();
        let initial = ViewSnapshot {
            phase: Phase::Idle,
            visible: catalog.clone(),
            catalog_size: catalog.len(),
            categories: categories.clone(),
            state: state.clone(),
        };
        let (view, view_rx) = watch::channel(initial);

        let controller = Self {
            api,
            config,
            catalog,
            categories,
            state,
            debouncer,
            commits,
            commands,
            events_tx,
            events,
            view,
            issued: 0,
            applied: 0,
        };
        (controller, SearchHandle { tx }, view_rx)
    }

    pub fn spawn(
        api: Arc<A>,
        config: ControllerConfig,
        page: StorefrontPage,
    ) -> (SearchHandle, watch::Receiver<ViewSnapshot>, JoinHandle<()>) {
        let (controller, handle, view) = Self::new(api, config, page);
        let task = tokio::spawn(controller.run());
        (handle, view, task)
    }

    pub async fn run(mut self) {
        if self.config.refresh_categories_on_load {
            self.refresh_categories();
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(fired) = self.commits.recv() => {
                    if let Some(text) = self.debouncer.accept(fired) {
                        self.commit_query(text);
                    }
                }
                Some(event) = self.events.recv() => self.handle_event(event),
            }
            self.publish();
        }

        self.debouncer.cancel();
        debug!("搜索控制器已停止");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Input(text) => {
                self.state.query_text = text.clone();
                self.debouncer.schedule(text);
            }
            Command::SelectCategory(category) => {
                let category = category.filter(|c| !c.is_empty());
                if category == self.state.selected_category {
                    return;
                }
                self.state.selected_category = category;
                self.evaluate();
            }
            Command::Shutdown => {}
        }
    }

    fn commit_query(&mut self, text: String) {
        if text == self.state.committed_query {
            return;
        }
        self.state.committed_query = text;
        self.evaluate();
    }

    /// 提交的查询或分类变化后重新判断是否需要搜索
    fn evaluate(&mut self) {
        if !self.state.is_active(self.config.min_query_len) {
            self.state.results = None;
            self.state.error = None;
            // 回到空闲后，在途请求的结果全部作废
            self.applied = self.issued;
            return;
        }

        self.issued += 1;
        let seq = self.issued;
        let query = SearchQuery::new(
            self.state.committed_query.clone(),
            self.state.selected_category.clone(),
        );
        debug!("发出搜索请求 #{}: {:?}", seq, query);

        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = api.search(&query).await;
            let _ = tx.send(Event::SearchResolved { seq, outcome });
        });
    }

    fn refresh_categories(&self) {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = api.categories().await;
            let _ = tx.send(Event::CategoriesLoaded(outcome));
        });
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::SearchResolved { seq, outcome } => {
                if seq <= self.applied {
                    debug!("丢弃过期的搜索响应 #{} (已应用 #{})", seq, self.applied);
                    return;
                }
                self.applied = seq;
                match outcome {
                    Ok(products) => {
                        info!("搜索 #{} 返回 {} 个商品", seq, products.len());
                        self.state.results = Some(products);
                        self.state.error = None;
                    }
                    Err(e) => {
                        warn!("搜索 #{} 失败: {}", seq, e);
                        self.state.results = Some(Vec::new());
                        self.state.error = Some(e.to_string());
                    }
                }
            }
            Event::CategoriesLoaded(Ok(categories)) => {
                self.categories = sorted_categories(categories);
            }
            Event::CategoriesLoaded(Err(e)) => {
                warn!("刷新分类失败，保留首屏分类: {}", e);
            }
        }
    }

    fn phase(&self) -> Phase {
        if self.debouncer.is_pending() || self.issued > self.applied {
            return Phase::Pending;
        }
        match (&self.state.error, &self.state.results) {
            (Some(_), _) => Phase::Failed,
            (None, None) => Phase::Idle,
            (None, Some(results)) if results.is_empty() => Phase::Empty,
            (None, Some(_)) => Phase::Resolved,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            phase: self.phase(),
            state: self.state.clone(),
            categories: self.categories.clone(),
            visible: visible_products(
                &self.catalog,
                &self.state,
                self.config.empty_results_fall_back_to_catalog,
            ),
            catalog_size: self.catalog.len(),
        }
    }

    fn publish(&self) {
        self.view.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::{sleep, Instant};

    fn product(id: &str, title: &str, category: &str) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            price: 1999,
            category: category.to_string(),
            image: String::new(),
            rating_rate: 4.0,
            rating_count: 10,
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("1", "Slim Fit Shirt", "men"),
            product("2", "Rain Jacket", "women"),
            product("3", "Shoe Rack", "home"),
            product("4", "Shoe Polish", "men"),
            product("5", "USB Drive", "electronics"),
        ]
    }

    fn category(name: &str) -> Category {
        Category {
            name: name.to_string(),
            count: None,
        }
    }

    fn page() -> StorefrontPage {
        StorefrontPage {
            products: catalog(),
            categories: vec![category("women"), category("men")],
        }
    }

    /// 按标题子串和分类过滤的假接口，可配置延迟与失败
    struct FakeApi {
        calls: Mutex<Vec<(SearchQuery, Instant)>>,
        delay: fn(&SearchQuery) -> Duration,
        fail: bool,
        categories: Result<Vec<Category>, ClientError>,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delay: |_| Duration::ZERO,
                fail: false,
                categories: Ok(vec![category("women"), category("men")]),
            }
        }

        fn calls(&self) -> Vec<(SearchQuery, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchApi for FakeApi {
        async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.clone(), Instant::now()));
            let delay = (self.delay)(query);
            if !delay.is_zero() {
                sleep(delay).await;
            }
            if self.fail {
                return Err(ClientError::Timeout);
            }
            let needle = query.query.to_lowercase();
            Ok(catalog()
                .into_iter()
                .filter(|p| query.category.as_ref().map_or(true, |c| &p.category == c))
                .filter(|p| p.title.to_lowercase().contains(&needle))
                .collect())
        }

        async fn categories(&self) -> Result<Vec<Category>, ClientError> {
            self.categories.clone()
        }
    }

    fn config() -> ControllerConfig {
        ControllerConfig {
            debounce: Duration::from_millis(500),
            min_query_len: 3,
            refresh_categories_on_load: false,
            empty_results_fall_back_to_catalog: false,
        }
    }

    fn start(
        api: FakeApi,
        config: ControllerConfig,
    ) -> (Arc<FakeApi>, SearchHandle, watch::Receiver<ViewSnapshot>) {
        let api = Arc::new(api);
        let (handle, view, _task) = SearchController::spawn(api.clone(), config, page());
        (api, handle, view)
    }

    async fn wait_for(
        view: &mut watch::Receiver<ViewSnapshot>,
        mut done: impl FnMut(&ViewSnapshot) -> bool,
    ) -> ViewSnapshot {
        let snapshot = tokio::time::timeout(Duration::from_secs(30), view.wait_for(|s| done(s)))
            .await
            .expect("timed out waiting for snapshot")
            .expect("controller stopped");
        ViewSnapshot::clone(&snapshot)
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_snapshot_shows_catalog() {
        let (_api, _handle, view) = start(FakeApi::new(), config());
        let snapshot = view.borrow().clone();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.visible.len(), 5);
        let names: Vec<_> = snapshot.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["men", "women"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_stays_idle() {
        let (api, handle, mut view) = start(FakeApi::new(), config());

        handle.input("sh");
        sleep(Duration::from_millis(600)).await;
        let snapshot = wait_for(&mut view, |s| s.state.committed_query == "sh").await;
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.visible.len(), 5);
        assert!(api.calls().is_empty());

        let typed_at = Instant::now();
        handle.input("sho");
        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Resolved).await;
        assert_eq!(ids(&snapshot.visible), vec!["3", "4"]);

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, SearchQuery::new("sho", None));
        assert!(calls[0].1 - typed_at >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystroke_burst_sends_one_request() {
        let (api, handle, mut view) = start(FakeApi::new(), config());
        let began = Instant::now();

        handle.input("s");
        sleep(Duration::from_millis(100)).await;
        handle.input("sh");
        sleep(Duration::from_millis(100)).await;
        handle.input("sho");
        sleep(Duration::from_millis(400)).await;
        handle.input("shoe");

        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Resolved).await;
        assert_eq!(snapshot.state.committed_query, "shoe");

        sleep(Duration::from_secs(2)).await;
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.query, "shoe");
        let sent_after = calls[0].1 - began;
        assert!(
            sent_after >= Duration::from_millis(1100) && sent_after < Duration::from_millis(1110),
            "sent after {sent_after:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_activates_without_debounce() {
        let (api, handle, mut view) = start(FakeApi::new(), config());
        let began = Instant::now();

        handle.select_category(Some("electronics".to_string()));
        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Resolved).await;
        assert_eq!(ids(&snapshot.visible), vec!["5"]);

        let calls = api.calls();
        assert_eq!(
            calls[0].0,
            SearchQuery::new("", Some("electronics".to_string()))
        );
        assert!(calls[0].1 - began < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let mut api = FakeApi::new();
        // 无分类的请求很慢，带分类的请求很快
        api.delay = |q| {
            if q.category.is_some() {
                Duration::from_millis(10)
            } else {
                Duration::from_millis(1000)
            }
        };
        let (api, handle, mut view) = start(api, config());

        handle.input("shoe");
        sleep(Duration::from_millis(510)).await;
        handle.select_category(Some("men".to_string()));

        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Resolved).await;
        assert_eq!(ids(&snapshot.visible), vec!["4"]);

        // 慢请求在之后返回，不能覆盖新结果
        sleep(Duration::from_secs(2)).await;
        let snapshot = view.borrow().clone();
        assert_eq!(snapshot.phase, Phase::Resolved);
        assert_eq!(ids(&snapshot.visible), vec!["4"]);
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returning_to_idle_retires_in_flight_request() {
        let mut api = FakeApi::new();
        api.delay = |_| Duration::from_millis(1000);
        let (_api, handle, mut view) = start(api, config());

        handle.input("shoe");
        sleep(Duration::from_millis(600)).await;
        handle.input("sh");

        sleep(Duration::from_secs(3)).await;
        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Idle).await;
        assert_eq!(snapshot.state.results, None);
        assert_eq!(snapshot.visible.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_category_returns_to_catalog() {
        let (_api, handle, mut view) = start(FakeApi::new(), config());

        handle.select_category(Some("men".to_string()));
        wait_for(&mut view, |s| s.phase == Phase::Resolved).await;

        handle.select_category(Some(String::new()));
        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Idle).await;
        assert_eq!(snapshot.state.selected_category, None);
        assert_eq!(snapshot.visible.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_results_render_empty() {
        let (_api, handle, mut view) = start(FakeApi::new(), config());

        handle.input("zzz");
        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Empty).await;
        assert!(snapshot.visible.is_empty());
        assert_eq!(snapshot.state.results, Some(Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_legacy_fallback_shows_catalog_on_zero_results() {
        // 已知缺陷的兼容开关：零结果退回完整目录
        let config = ControllerConfig {
            empty_results_fall_back_to_catalog: true,
            ..config()
        };
        let (_api, handle, mut view) = start(FakeApi::new(), config);

        handle.input("zzz");
        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Empty).await;
        assert_eq!(snapshot.visible.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shows_inline_error() {
        let mut api = FakeApi::new();
        api.fail = true;
        let (_api, handle, mut view) = start(api, config());

        handle.input("shirt");
        let snapshot = wait_for(&mut view, |s| s.phase == Phase::Failed).await;
        assert!(snapshot.visible.is_empty());
        assert_eq!(snapshot.state.error.as_deref(), Some("request timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_categories_refresh_on_load() {
        let mut api = FakeApi::new();
        api.categories = Ok(vec![category("women"), category("electronics"), category("men")]);
        let refresh = ControllerConfig {
            refresh_categories_on_load: true,
            ..config()
        };
        let (_api, _handle, mut view) = start(api, refresh);

        let snapshot = wait_for(&mut view, |s| s.categories.len() == 3).await;
        let names: Vec<_> = snapshot.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["electronics", "men", "women"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_disabled_keeps_seeded_categories() {
        let mut api = FakeApi::new();
        api.categories = Ok(vec![category("electronics")]);
        let (_api, _handle, view) = start(api, config());

        sleep(Duration::from_secs(1)).await;
        let names: Vec<_> = view
            .borrow()
            .categories
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["men", "women"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_seeded_categories() {
        let mut api = FakeApi::new();
        api.categories = Err(ClientError::Transport("connection refused".to_string()));
        let refresh = ControllerConfig {
            refresh_categories_on_load: true,
            ..config()
        };
        let (_api, _handle, view) = start(api, refresh);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(view.borrow().categories.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_controller() {
        let api = Arc::new(FakeApi::new());
        let (handle, _view, task) = SearchController::spawn(api, config(), page());

        handle.shutdown();
        task.await.unwrap();
        assert!(!handle.input("shoe"));
    }
}
