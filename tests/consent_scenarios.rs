use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use cookiebox::cookies::{CookieJarHandle, CookieStore, DefaultCookieJar, JsonCookieStore};
use cookiebox::filters::{DeferredSourceFilter, EmbedDocument, EmbeddedResource, FlagFilter};
use cookiebox::{BoxState, CategoryDecl, ConsentBox, FnFilter};

type Calls = Arc<Mutex<Vec<String>>>;

fn categories() -> Vec<CategoryDecl> {
    vec![
        CategoryDecl::new("analytics"),
        CategoryDecl::new("maps"),
        CategoryDecl::child_of("maps.sub1", "maps"),
        CategoryDecl::child_of("maps.sub2", "maps"),
    ]
}

fn recording(name: &'static str, calls: &Calls) -> FnFilter<impl Fn() -> anyhow::Result<()> + Send + Sync, impl Fn() -> anyhow::Result<()> + Send + Sync> {
    let (g, r) = (calls.clone(), calls.clone());
    FnFilter::new(
        name,
        move || {
            g.lock().unwrap().push(format!("+{name}"));
            Ok(())
        },
        move || {
            r.lock().unwrap().push(format!("-{name}"));
            Ok(())
        },
    )
}

fn page(jar: &CookieJarHandle, calls: &Calls) -> ConsentBox {
    let mut cookiebox = ConsentBox::builder()
        .categories(categories())
        .cookie_jar(jar.clone())
        .create()
        .unwrap();
    cookiebox.register_filter(recording("analytics", calls));
    cookiebox.register_filter(recording("maps", calls));
    cookiebox.register_filter(recording("youtube", calls));
    cookiebox
}

fn in_memory_jar() -> CookieJarHandle {
    Arc::new(RwLock::new(DefaultCookieJar::new()))
}

#[test]
fn sub_category_selection_excludes_parent_and_sibling() {
    let calls = Calls::default();
    let jar = in_memory_jar();
    let mut cookiebox = page(&jar, &calls);
    cookiebox.init().unwrap();

    cookiebox.toggle("maps", true).unwrap();
    cookiebox.toggle("maps.sub2", false).unwrap();
    assert!(!cookiebox.tree().is_checked("maps").unwrap());

    cookiebox.accept_selection().unwrap();

    let record = cookiebox.store().load().unwrap();
    assert_eq!(record.iter().collect::<Vec<_>>(), vec!["maps.sub1"]);
    assert_eq!(cookiebox.state(), &BoxState::Hidden);
}

#[test]
fn first_visit_waits_for_accept_before_dispatch() {
    let calls = Calls::default();
    let jar = in_memory_jar();
    let mut cookiebox = page(&jar, &calls);

    cookiebox.init().unwrap();
    assert_eq!(cookiebox.state(), &BoxState::Visible);
    assert!(calls.lock().unwrap().is_empty());

    cookiebox.accept_all().unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["+analytics", "+maps", "-youtube"]);
}

#[test]
fn returning_visitor_gets_persisted_consent_dispatched() {
    let jar = in_memory_jar();
    {
        let mut first = page(&jar, &Calls::default());
        first.init().unwrap();
        first.toggle("analytics", true).unwrap();
        first.accept_selection().unwrap();
    }

    let calls = Calls::default();
    let mut second = page(&jar, &calls);
    second.init().unwrap();

    assert_eq!(second.state(), &BoxState::Hidden);
    assert_eq!(*calls.lock().unwrap(), vec!["+analytics", "-maps", "-youtube"]);
    assert!(second.has_consent("analytics"));
    assert!(!second.has_consent("maps"));
}

#[test]
fn open_highlight_then_hide() {
    let jar = in_memory_jar();
    let mut cookiebox = page(&jar, &Calls::default());

    cookiebox.open(Some("maps")).unwrap();
    assert_eq!(cookiebox.state(), &BoxState::Highlighted("maps".into()));
    assert!(cookiebox.is_expanded("maps"));

    cookiebox.hide().unwrap();
    assert_eq!(cookiebox.state(), &BoxState::Hidden);
    assert_eq!(cookiebox.highlighted(), None);
    assert!(!cookiebox.is_expanded("maps"));
}

#[test]
fn reconsent_overwrites_and_redispatches() {
    let calls = Calls::default();
    let jar = in_memory_jar();
    let mut cookiebox = page(&jar, &calls);
    cookiebox.init().unwrap();
    cookiebox.accept_all().unwrap();

    cookiebox.open(None).unwrap();
    assert!(cookiebox.tree().is_checked("analytics").unwrap());
    cookiebox.toggle("analytics", false).unwrap();
    cookiebox.toggle("maps", false).unwrap();
    cookiebox.accept_selection().unwrap();

    // An empty selection is still an answer: the record exists but holds nothing
    assert_eq!(cookiebox.store().raw().as_deref(), Some(""));
    assert_eq!(cookiebox.store().load(), None);
    assert!(!cookiebox.has_consent("analytics"));
    assert_eq!(calls.lock().unwrap()[3..].to_vec(), vec!["-analytics", "-maps", "-youtube"]);

    let mut next_page = page(&jar, &Calls::default());
    next_page.init().unwrap();
    assert_eq!(next_page.state(), &BoxState::Hidden);
}

#[test]
fn consent_survives_restart_through_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.json");

    {
        let store = JsonCookieStore::new(path.clone());
        let mut cookiebox = page(&store.jar(), &Calls::default());
        cookiebox.init().unwrap();
        cookiebox.toggle("maps", true).unwrap();
        cookiebox.accept_selection().unwrap();
    }

    let store = JsonCookieStore::new(path);
    let calls = Calls::default();
    let mut cookiebox = page(&store.jar(), &calls);
    cookiebox.init().unwrap();

    assert_eq!(cookiebox.state(), &BoxState::Hidden);
    assert_eq!(*calls.lock().unwrap(), vec!["-analytics", "+maps", "-youtube"]);
}

#[test]
fn box_keeps_its_cookie_store_alive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.json");

    {
        let mut cookiebox = ConsentBox::builder()
            .categories(categories())
            .cookie_store(JsonCookieStore::new(path.clone()))
            .create()
            .unwrap();
        cookiebox.init().unwrap();
        cookiebox.toggle("analytics", true).unwrap();
        cookiebox.accept_selection().unwrap();
        cookiebox.flush();
    }

    let store = JsonCookieStore::new(path);
    let cookiebox = page(&store.jar(), &Calls::default());
    assert!(cookiebox.has_consent("analytics"));
    assert!(!cookiebox.has_consent("maps.sub1"));
}

#[test]
fn concrete_filters_follow_consent() {
    let doc = Arc::new(RwLock::new(EmbedDocument {
        resources: vec![EmbeddedResource::deferred("https://www.google.com/maps/embed?pb=1")],
    }));
    let ga_disabled = Arc::new(AtomicBool::new(false));

    let mut cookiebox = ConsentBox::builder()
        .categories([CategoryDecl::new("google-analytics"), CategoryDecl::new("google-maps")])
        .filter(FlagFilter::new("google-analytics", ga_disabled.clone()))
        .filter(DeferredSourceFilter::new("google-maps", "/maps/embed", doc.clone()))
        .create()
        .unwrap();

    cookiebox.init().unwrap();
    cookiebox.toggle("google-maps", true).unwrap();
    cookiebox.accept_selection().unwrap();

    assert!(ga_disabled.load(Ordering::SeqCst));
    let resource = doc.read().unwrap().resources[0].clone();
    assert_eq!(resource.src.as_deref(), Some("https://www.google.com/maps/embed?pb=1"));
    assert!(resource.allowed);

    cookiebox.open(None).unwrap();
    cookiebox.toggle("google-maps", false).unwrap();
    cookiebox.toggle("google-analytics", true).unwrap();
    cookiebox.accept_selection().unwrap();

    assert!(!ga_disabled.load(Ordering::SeqCst));
    let resource = doc.read().unwrap().resources[0].clone();
    assert_eq!(resource, EmbeddedResource::deferred("https://www.google.com/maps/embed?pb=1"));
}
