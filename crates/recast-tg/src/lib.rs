mod config;
mod error;
mod gen;
mod http;
mod observability;
mod relay;
mod sched;
mod server;
mod tg;

pub mod util;

pub use crate::error::*;
pub use config::*;
pub use observability::*;

#[allow(unused_imports)]
mod prelude {
    pub(crate) use crate::error::{
        err, err_ctx, fatal, ErrorKind, OptionExt as _, Result, ResultExt as _,
    };
    pub(crate) use crate::http::prelude::*;
    pub(crate) use crate::observability::logging::prelude::*;
    pub(crate) use crate::util::prelude::*;
}

use prelude::*;
use std::sync::Arc;

/// Wire everything up and serve triggers until the process is stopped:
/// the daily randomized schedule and the HTTP endpoint both drive the same
/// relay service.
pub async fn run(config: Config) -> Result {
    let bot = tg::bot_from_config(&config.tg);
    let http = http::create_client();

    let destination = config.tg.destination.clone();
    let store = relay::JsonFileStore::new(config.relay.store_path.clone());

    let relay = relay::Relay::new(
        config.relay,
        destination.clone(),
        tg::TgSource::new(bot.clone()),
        tg::TgPublisher::new(bot.clone()),
        store,
    );

    let state = Arc::new(server::AppState {
        relay: tokio::sync::Mutex::new(relay),
        gen: gen::Client::new(config.gen, http),
        publisher: tg::TgPublisher::new(bot),
        destination,
    });

    info!("Starting the relay service...");

    tokio::select! {
        result = server::serve(config.server, Arc::clone(&state)) => result,
        () = sched::run(state) => Ok(()),
    }
}
