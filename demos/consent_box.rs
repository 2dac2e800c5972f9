use cookiebox::cookies::JsonCookieStore;
use cookiebox::filters::{DeferredSourceFilter, EmbedDocument, EmbeddedResource, FlagFilter};
use cookiebox::{CategoryDecl, ConsentBox, ConsentConfig, ConsentError, ConsentEvent, FnFilter, Subscription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

fn main() -> Result<(), ConsentError> {
    env_logger::init();

    // Configure the consent box through the config builder. The cookie name and retention are
    // what a returning visitor's browser will carry around.
    let cfg = ConsentConfig::builder()
        .cookie_name("cookiebox")
        .retention_days(365)
        .site("https://example.org/")
        .build()
        .expect("ConsentConfig is not valid");

    // Persist the cookie jar into a json file, so running this demo twice shows the
    // returning-visitor flow on the second run.
    let path = std::env::temp_dir().join("cookiebox-demo.json");
    let store = JsonCookieStore::new(path.clone());

    // A page with one deferred map embed and an analytics script that can be switched off.
    let document = Arc::new(RwLock::new(EmbedDocument {
        resources: vec![EmbeddedResource::deferred("https://www.google.com/maps/embed?pb=demo")],
    }));
    let ga_disabled = Arc::new(AtomicBool::new(false));

    let mut cookiebox = ConsentBox::builder()
        .config(cfg)
        .categories([
            CategoryDecl::new("google-analytics"),
            CategoryDecl::new("external-media"),
            CategoryDecl::child_of("google-maps", "external-media"),
            CategoryDecl::child_of("youtube", "external-media"),
        ])
        .cookie_store(store)
        .filter(FlagFilter::new("google-analytics", ga_disabled.clone()))
        .filter(DeferredSourceFilter::new("google-maps", "/maps/embed", document.clone()))
        .filter(FnFilter::new(
            "youtube",
            || {
                println!("youtube: players may load");
                Ok(())
            },
            || {
                println!("youtube: players stay blocked");
                Ok(())
            },
        ))
        .create()?;

    // Only events sent after subscribing are received.
    let mut events = cookiebox.subscribe();

    cookiebox.init()?;
    drain(&mut events);

    if cookiebox.is_visible() {
        // First visit: the visitor opens the external media panel and only allows maps.
        cookiebox.expand("external-media")?;
        cookiebox.toggle("google-maps", true)?;
        let report = cookiebox.accept_selection()?;
        println!("granted {:?}, revoked {:?}", report.granted, report.revoked);
        drain(&mut events);
    }

    // Later on, a "change settings" link reopens the box pointing at analytics.
    cookiebox.open(Some("google-analytics"))?;
    cookiebox.hide()?;
    drain(&mut events);

    println!("analytics disabled: {}", ga_disabled.load(Ordering::SeqCst));
    println!("map embed: {:?}", document.read().expect("document lock").resources[0]);
    cookiebox.flush();
    println!("consent record kept in {}", path.display());

    Ok(())
}

fn drain(events: &mut Subscription) {
    while let Ok(ev) = events.try_recv() {
        match ev {
            ConsentEvent::Shown { highlight } => println!("event: shown (highlight: {highlight:?})"),
            ConsentEvent::Hidden => println!("event: hidden"),
            ConsentEvent::ConsentSaved { ids } => println!("event: consent saved {ids:?}"),
            ConsentEvent::FiltersDispatched { granted, revoked, failed } => {
                println!("event: dispatched granted={granted:?} revoked={revoked:?} failed={failed:?}")
            }
        }
    }
}
