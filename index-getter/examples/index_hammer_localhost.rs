use index_getter::runner::{self, RunConfig};
use index_getter::{HttpSession, IndexGetterUser};
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();
    let session = HttpSession::new("http://localhost:8000").unwrap();
    let config = RunConfig::builder()
        .users(3000)
        .run_time(Duration::from_secs(1))
        .build();

    let report = runner::run::<IndexGetterUser>(session, &config)
        .await
        .unwrap();
    println!("{report:#?}");
}
