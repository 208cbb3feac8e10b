use crate::request::Request;

/// Handles one `msg_id`'s worth of traffic.
///
/// Mirrors the reference `IRouter`/`BaseRouter` split: implementors override
/// only the hook they care about, `handle` being the one that matters in
/// practice. `pre_handle`/`post_handle` default to no-ops so a router that
/// only needs `handle` doesn't have to say so twice.
pub trait Router: Send + Sync {
    fn pre_handle(&self, _req: &Request) {}

    fn handle(&self, req: &Request);

    fn post_handle(&self, _req: &Request) {}
}
