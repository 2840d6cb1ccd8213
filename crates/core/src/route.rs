use crate::models::{HandlerId, Intent};

/// Map a classified intent to the responder that handles it.
///
/// Pure and total over the intent set; the exhaustive match means adding an
/// intent without routing it is a compile error.
pub fn route_intent(intent: Intent) -> HandlerId {
    match intent {
        Intent::Joke => HandlerId::JokeTeller,
        Intent::Fact => HandlerId::FactProvider,
        Intent::Advice => HandlerId::Advisor,
        Intent::General => HandlerId::Fallback,
    }
}
