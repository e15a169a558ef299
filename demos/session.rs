use sketch_engine::{AnalysisSession, SketchConfig, UnencodablePolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketch_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SketchConfig::for_expected_items(1000, 0.01).unwrap();
    let mut session = AnalysisSession::new(config)
        .unwrap()
        .with_policy(UnencodablePolicy::Skip);

    if let Err(e) = session.count_distinct(["apple"]) {
        println!("before loading: {}", e);
    }

    session.load().unwrap();
    let column = ["apple", "banana", "cherry", "apple", "banana", "apple"];
    let summary = session.count_distinct(column).unwrap();
    println!("{}", summary);

    let report = session.check_presence(["apple", "grape", "cherry"]).unwrap();
    println!("{}", report);

    let numbers = session.count_distinct(0..10_000).unwrap();
    println!("{}", numbers);
    println!("{:?}", session.filter().unwrap());
    println!("{:?}", session.estimator().unwrap());
}
