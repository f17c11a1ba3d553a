use async_trait::async_trait;
use lsp_types::Position;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use symnav::config::Config;
use symnav::error::{ProviderError, ProviderResult};
use symnav::provider::{FuzzyFinder, PresentationSink, SymbolProvider, SyntaxTreeFallback};
use symnav::render::RenderFrame;
use symnav::session::{Command, Scope, Session, SessionEvent};
use symnav::symbol::{span, BufferId, HierarchicalSymbol, JumpTarget, Reference, SymbolEntry, SymbolKind};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::time::{sleep, Instant};

#[derive(Default)]
struct RecordingSink {
    frames: RefCell<Vec<RenderFrame>>,
    jumps: RefCell<Vec<JumpTarget>>,
    reports: RefCell<Vec<String>>,
}

impl PresentationSink for RecordingSink {
    fn render(&self, frame: &RenderFrame) {
        self.frames.borrow_mut().push(frame.clone());
    }

    fn jump(&self, target: &JumpTarget) {
        self.jumps.borrow_mut().push(target.clone());
    }

    fn report(&self, message: &str) {
        self.reports.borrow_mut().push(message.to_string());
    }
}

/// Serves one class per buffer, named after the file stem.
struct FakeProvider {
    start: Instant,
    fetches: RefCell<Vec<(BufferId, Duration)>>,
    delays: Vec<(&'static str, Duration)>,
    fail_after: Option<usize>,
    namespace_entries: Vec<SymbolEntry>,
}

impl FakeProvider {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            fetches: RefCell::new(Vec::new()),
            delays: Vec::new(),
            fail_after: None,
            namespace_entries: Vec::new(),
        }
    }

    fn fetch_times(&self) -> Vec<Duration> {
        self.fetches.borrow().iter().map(|(_, t)| *t).collect()
    }
}

fn class_with_methods(name: &str, methods: &[&str]) -> HierarchicalSymbol {
    let mut class = HierarchicalSymbol::new(name, SymbolKind::Class);
    class.selection_range = Some(span(0, 6, 0, 6 + name.len() as u32));
    class.children = methods
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let mut sym = HierarchicalSymbol::new(*m, SymbolKind::Method).with_detail("public int Count()");
            sym.selection_range = Some(span(i as u32 + 1, 4, i as u32 + 1, 9));
            sym
        })
        .collect();
    class
}

#[async_trait(?Send)]
impl SymbolProvider for FakeProvider {
    async fn fetch_document_symbols(&self, buffer: &BufferId) -> ProviderResult<Vec<HierarchicalSymbol>> {
        let n = {
            let mut fetches = self.fetches.borrow_mut();
            fetches.push((buffer.clone(), self.start.elapsed()));
            fetches.len()
        };
        if self.fail_after.map(|limit| n > limit).unwrap_or(false) {
            return Err(ProviderError::Unavailable(buffer.to_string()));
        }

        let stem = buffer
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some((_, delay)) = self.delays.iter().find(|(name, _)| *name == stem) {
            sleep(*delay).await;
        }
        Ok(vec![class_with_methods(&stem, &["GetUser", "GetUsers", "Delete"])])
    }

    async fn fetch_references(&self, buffer: &BufferId, position: Position) -> ProviderResult<Vec<Reference>> {
        Ok((0..2)
            .map(|i| Reference {
                file: buffer.path().to_path_buf(),
                range: span(position.line + i, 0, position.line + i, 4),
            })
            .collect())
    }

    async fn fetch_workspace_symbols(&self, _namespace: &str) -> ProviderResult<Vec<SymbolEntry>> {
        Ok(self.namespace_entries.clone())
    }
}

struct FixedNamespace(Option<&'static str>);

#[async_trait(?Send)]
impl SyntaxTreeFallback for FixedNamespace {
    async fn parse_declaration_near(&self, _buffer: &BufferId) -> Option<String> {
        self.0.map(str::to_string)
    }
}

/// Detection that takes a while to answer.
struct SlowNamespace(Option<&'static str>, Duration);

#[async_trait(?Send)]
impl SyntaxTreeFallback for SlowNamespace {
    async fn parse_declaration_near(&self, _buffer: &BufferId) -> Option<String> {
        sleep(self.1).await;
        self.0.map(str::to_string)
    }
}

fn billing_entry() -> SymbolEntry {
    SymbolEntry {
        qualified_name: "Acme.Services.Billing".into(),
        simple_name: "Billing".into(),
        kind: SymbolKind::Class,
        signature: None,
        range: Some(span(3, 0, 9, 1)),
        selection_range: Some(span(3, 13, 3, 20)),
        source_file: Some(PathBuf::from("/w/Billing.cs")),
        depth: 2,
    }
}

/// Picks the first entry whose formatted path contains the needle.
struct NeedleFinder(&'static str);

impl FuzzyFinder for NeedleFinder {
    fn pick(&self, entries: &[SymbolEntry], format: &dyn Fn(&SymbolEntry) -> String) -> Option<usize> {
        entries.iter().position(|e| format(e).contains(self.0))
    }
}

fn config(debounce_ms: u64) -> Config {
    let mut cfg = Config::default();
    cfg.navigator.debounce_ms = debounce_ms;
    cfg
}

fn names(session: &Session) -> Vec<String> {
    session
        .navigator()
        .full_index()
        .iter()
        .map(|e| e.qualified_name.clone())
        .collect()
}

fn cmd(tx: &UnboundedSender<SessionEvent>, c: Command) {
    tx.send(SessionEvent::Command(c)).unwrap();
}

#[tokio::test(start_paused = true)]
async fn debounce_collapses_rapid_changes_into_one_fetch() {
    let provider = Rc::new(FakeProvider::new());
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider.clone(), sink, config(500));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        // Let the initial fetch land first.
        sleep(Duration::from_millis(1)).await;
        let t0 = Instant::now();
        tx.send(SessionEvent::ContentChanged).unwrap();
        sleep(Duration::from_millis(100)).await;
        tx.send(SessionEvent::ContentChanged).unwrap();
        sleep(Duration::from_millis(1_000)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
        t0
    };

    let (_session, t0) = tokio::join!(session.run(rx), driver);

    let times = provider.fetch_times();
    assert_eq!(times.len(), 2, "initial fetch plus exactly one debounced fetch: {times:?}");
    let debounced = provider.start + times[1] - t0;
    assert!(
        debounced >= Duration::from_millis(600) && debounced < Duration::from_millis(605),
        "debounced fetch at {debounced:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn save_cancels_pending_debounce_and_fetches_immediately() {
    let provider = Rc::new(FakeProvider::new());
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider.clone(), sink, config(500));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(10)).await;
        tx.send(SessionEvent::ContentChanged).unwrap();
        sleep(Duration::from_millis(50)).await;
        tx.send(SessionEvent::Saved).unwrap();
        sleep(Duration::from_millis(2_000)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    tokio::join!(session.run(rx), driver);

    let times = provider.fetch_times();
    assert_eq!(times.len(), 2, "{times:?}");
    assert!(times[1] >= Duration::from_millis(60) && times[1] < Duration::from_millis(65));
}

#[tokio::test(start_paused = true)]
async fn fetch_for_previous_buffer_is_discarded() {
    let mut fake = FakeProvider::new();
    fake.delays.push(("Slow", Duration::from_millis(300)));
    let provider = Rc::new(fake);
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Slow.cs"), provider.clone(), sink.clone(), config(500));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(10)).await;
        tx.send(SessionEvent::BufferSwitched(BufferId::new("/w/Fast.cs"))).unwrap();
        // Well past the slow fetch resolving.
        sleep(Duration::from_millis(1_000)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    assert_eq!(provider.fetches.borrow().len(), 2);
    assert_eq!(session.buffer(), &BufferId::new("/w/Fast.cs"));
    assert_eq!(
        names(&session),
        vec!["Fast", "Fast.GetUser", "Fast.GetUsers", "Fast.Delete"]
    );
    assert!(sink.reports.borrow().is_empty(), "stale fetches are never surfaced");
}

#[tokio::test(start_paused = true)]
async fn provider_error_is_reported_and_index_kept() {
    let mut fake = FakeProvider::new();
    fake.fail_after = Some(1);
    let provider = Rc::new(fake);
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider.clone(), sink.clone(), config(500));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(10)).await;
        tx.send(SessionEvent::Refresh).unwrap();
        sleep(Duration::from_millis(10)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    assert_eq!(names(&session).len(), 4, "previous index survives the failure");
    let reports = sink.reports.borrow();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("/w/Users.cs"), "{reports:?}");
}

#[tokio::test(start_paused = true)]
async fn navigation_renders_when_visible_and_jumps_when_hidden() {
    let provider = Rc::new(FakeProvider::new());
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider, sink.clone(), config(500));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(10)).await;
        cmd(&tx, Command::Next);
        cmd(&tx, Command::Show);
        cmd(&tx, Command::Next);
        cmd(&tx, Command::BeginFilter);
        cmd(&tx, Command::Type { text: "getu".into() });
        cmd(&tx, Command::Accept);
        cmd(&tx, Command::Hide);
        cmd(&tx, Command::Prev);
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    let jumps = sink.jumps.borrow();
    // Hidden next lands on GetUser; hidden prev in the "getu" listing lands there again.
    assert_eq!(jumps.len(), 2, "{jumps:?}");
    assert_eq!((jumps[0].line, jumps[0].column), (1, 4));
    assert_eq!(jumps[0].file, PathBuf::from("/w/Users.cs"));

    let frames = sink.frames.borrow();
    let last = frames.last().unwrap();
    assert_eq!(last.query, "getu");
    assert!(!last.filtering);
    let rows: Vec<_> = last.rows.iter().map(|r| r.formatted_path.as_str()).collect();
    assert_eq!(rows, vec!["Users.GetUser", "Users.GetUsers"]);
    assert_eq!(session.navigator().query(), "getu");
}

#[tokio::test(start_paused = true)]
async fn references_cycle_with_wraparound() {
    let provider = Rc::new(FakeProvider::new());
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider, sink.clone(), config(500));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        cmd(&tx, Command::NextReference);
        cmd(&tx, Command::References { line: 7, column: 2 });
        sleep(Duration::from_millis(5)).await;
        for _ in 0..3 {
            cmd(&tx, Command::NextReference);
        }
        cmd(&tx, Command::PrevReference);
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    tokio::join!(session.run(rx), driver);

    let lines: Vec<_> = sink.jumps.borrow().iter().map(|j| j.line).collect();
    assert_eq!(lines, vec![7, 8, 7, 8]);
}

#[tokio::test(start_paused = true)]
async fn namespace_scope_toggles_and_resets_on_switch() {
    let mut fake = FakeProvider::new();
    fake.namespace_entries = vec![billing_entry()];
    let provider = Rc::new(fake);
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider, sink.clone(), config(500))
        .with_fallback(Rc::new(FixedNamespace(Some("Acme.Services"))));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(5)).await;
        cmd(&tx, Command::ToggleNamespace);
        sleep(Duration::from_millis(5)).await;
        cmd(&tx, Command::Show);
        sleep(Duration::from_millis(5)).await;
        tx.send(SessionEvent::BufferSwitched(BufferId::new("/w/Orders.cs"))).unwrap();
        sleep(Duration::from_millis(5)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    let frames = sink.frames.borrow();
    assert_eq!(frames[0].rows[0].formatted_path, "Acme.Services.Billing (Billing.cs)");
    assert_eq!(session.scope(), &Scope::File);
    assert_eq!(names(&session)[0], "Orders");
}

#[tokio::test(start_paused = true)]
async fn undetected_namespace_keeps_file_scope() {
    let provider = Rc::new(FakeProvider::new());
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider, sink, config(500))
        .with_fallback(Rc::new(FixedNamespace(None)));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(5)).await;
        cmd(&tx, Command::ToggleNamespace);
        sleep(Duration::from_millis(5)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    assert_eq!(session.scope(), &Scope::File);
    assert_eq!(names(&session)[0], "Users");
}

#[tokio::test(start_paused = true)]
async fn search_uses_finder_only_while_hidden() {
    let provider = Rc::new(FakeProvider::new());
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider, sink.clone(), config(500))
        .with_finder(Box::new(NeedleFinder("Delete")));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(5)).await;
        cmd(&tx, Command::Search);
        cmd(&tx, Command::Show);
        cmd(&tx, Command::Search);
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    let jumps = sink.jumps.borrow();
    assert_eq!(jumps.len(), 1);
    assert_eq!(jumps[0].line, 3, "Delete is the third method");
    assert_eq!(session.navigator().mode(), symnav::navigator::Mode::Filter);
    assert_eq!(session.navigator().cursor(), Some(4), "cursor followed the picked entry");
}

#[tokio::test(start_paused = true)]
async fn buffer_switch_clears_filter_and_pending_debounce() {
    let provider = Rc::new(FakeProvider::new());
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider.clone(), sink, config(500));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(5)).await;
        tx.send(SessionEvent::ContentChanged).unwrap();
        cmd(&tx, Command::BeginFilter);
        cmd(&tx, Command::Type { text: "get".into() });
        sleep(Duration::from_millis(5)).await;
        tx.send(SessionEvent::BufferSwitched(BufferId::new("/w/Orders.cs"))).unwrap();
        // Well past the debounce armed for the old buffer.
        sleep(Duration::from_millis(2_000)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    assert_eq!(session.navigator().query(), "");
    assert_eq!(session.navigator().mode(), symnav::navigator::Mode::Navigate);
    let fetched: Vec<_> = provider.fetches.borrow().iter().map(|(b, _)| b.clone()).collect();
    assert_eq!(
        fetched,
        vec![BufferId::new("/w/Users.cs"), BufferId::new("/w/Orders.cs")],
        "one fetch for the new buffer, none from the cancelled debounce"
    );
    assert_eq!(names(&session)[0], "Orders");
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_after_switch_leaves_no_entries_from_the_old_buffer() {
    let mut fake = FakeProvider::new();
    fake.fail_after = Some(1);
    let provider = Rc::new(fake);
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider, sink.clone(), config(500));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(5)).await;
        tx.send(SessionEvent::BufferSwitched(BufferId::new("/w/notes.txt"))).unwrap();
        sleep(Duration::from_millis(5)).await;
        cmd(&tx, Command::Jump);
        cmd(&tx, Command::Next);
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    assert!(names(&session).is_empty());
    assert_eq!(session.navigator().cursor(), None);
    assert!(sink.jumps.borrow().is_empty(), "{:?}", sink.jumps.borrow());
    assert_eq!(sink.reports.borrow().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn toggle_survives_a_debounce_firing_during_detection() {
    let mut fake = FakeProvider::new();
    fake.namespace_entries = vec![billing_entry()];
    let provider = Rc::new(fake);
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider, sink, config(100))
        .with_fallback(Rc::new(SlowNamespace(Some("Acme.Services"), Duration::from_millis(300))));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        sleep(Duration::from_millis(5)).await;
        tx.send(SessionEvent::ContentChanged).unwrap();
        sleep(Duration::from_millis(5)).await;
        cmd(&tx, Command::ToggleNamespace);
        sleep(Duration::from_millis(1_000)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    assert_eq!(session.scope(), &Scope::Namespace("Acme.Services".into()));
    assert_eq!(names(&session), vec!["Acme.Services.Billing"]);
}

#[tokio::test(start_paused = true)]
async fn undetected_namespace_does_not_swallow_a_pending_file_fetch() {
    let mut fake = FakeProvider::new();
    fake.delays.push(("Users", Duration::from_millis(200)));
    let provider = Rc::new(fake);
    let sink = Rc::new(RecordingSink::default());
    let session = Session::new(BufferId::new("/w/Users.cs"), provider.clone(), sink, config(500))
        .with_fallback(Rc::new(FixedNamespace(None)));
    let (tx, rx) = unbounded_channel();

    let driver = async move {
        // The initial fetch is still in flight.
        sleep(Duration::from_millis(10)).await;
        cmd(&tx, Command::ToggleNamespace);
        sleep(Duration::from_millis(1_000)).await;
        tx.send(SessionEvent::Shutdown).unwrap();
    };
    let (session, ()) = tokio::join!(session.run(rx), driver);

    assert_eq!(session.scope(), &Scope::File);
    assert_eq!(provider.fetches.borrow().len(), 2);
    assert_eq!(names(&session)[0], "Users");
}
