pub mod command_dispatcher;
pub mod poller;
pub mod registry;
pub mod snapshot_fetcher;
pub mod snapshot_store;
