use action_bus::prelude::*;
use action_bus_macros::action;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;

#[action]
struct Search {
    query: String,
}

#[action]
struct SearchSucceeded {
    hits: usize,
}

#[action]
struct SearchFailed {
    reason: String,
}

async fn search(query: String) -> anyhow::Result<usize> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    if query.is_empty() {
        anyhow::bail!("empty query");
    }
    Ok(query.len())
}

struct SearchEffects {
    actions: Actions,
}

impl SearchEffects {
    fn new(actions: Actions, lifecycle: &Lifecycle) -> ActionResult<Arc<Self>> {
        let effects = Arc::new(SearchEffects { actions });
        let _guard = lifecycle.enter_construction();
        init_action_handlers(&effects, lifecycle)?;
        Ok(effects)
    }
}

impl ActionHost for SearchEffects {
    fn host_kind() -> HostKind {
        HostKind::Service
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers.on_stream::<Search, _>("search", |effects: &SearchEffects, searches| {
            let actions = effects.actions.clone();
            searches.then(move |action| {
                let actions = actions.clone();
                async move {
                    futures_util::stream::once(search(action.query.clone()))
                        .dispatch_on_success(&actions, |hits| SearchSucceeded { hits: *hits })
                        .dispatch_on_error(&actions, |err| SearchFailed {
                            reason: err.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .await;
                }
            })
        });
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let actions = Actions::global().clone();
    let mut results = actions.on_action(kinds![SearchSucceeded, SearchFailed]);

    let lifecycle = Lifecycle::new();
    let _effects = SearchEffects::new(actions.clone(), &lifecycle)?;

    actions.dispatch(Search {
        query: "rust".into(),
    });
    actions.dispatch(Search {
        query: String::new(),
    });

    for _ in 0..2 {
        if let Some(result) = results.next().await {
            println!("{result:?}");
        }
    }

    lifecycle.destroy();
    lifecycle.join().await;
    Ok(())
}
