//! Keeping derived data in sync with a changing input, where deriving
//! is asynchronous and only the result for the latest input may land.
//!
//! An [`AbortableReaction`] is polled by its owner: `react` compares the
//! current input to the last one and starts a new derivation when it
//! changed, cancelling the one in flight; `poll_completions` (or
//! `settle`) drives the derivations and hands their results to the
//! owner through the callbacks. Callbacks only ever run inside those
//! calls, on the caller's thread.

use std::future::Future;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

mod cancel;

pub use cancel::{is_aborted, Aborted, CancelToken, Cancelled};

pub trait Alive {
    /// False once the owner has been torn down; results for a dead
    /// owner are dropped.
    fn is_alive(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

type DataFn<O, I> = Box<dyn Fn(&O) -> anyhow::Result<I>>;
type DeriveFn<O, I, V> =
    Box<dyn Fn(I, CancelToken, &O) -> LocalBoxFuture<'static, anyhow::Result<V>>>;
type StartedFn<O> = Box<dyn FnMut(&mut O, &CancelToken)>;
type SuccessFn<O, V> = Box<dyn FnMut(&mut O, V)>;
type ErrorFn<O> = Box<dyn FnMut(&mut O, &anyhow::Error)>;

struct Completion<V> {
    generation: u64,
    token: CancelToken,
    result: anyhow::Result<V>,
}

pub struct AbortableReaction<O, I, V> {
    name: String,

    data_fn: DataFn<O, I>,
    derive_fn: DeriveFn<O, I, V>,

    started_fn: Option<StartedFn<O>>,
    success_fn: Option<SuccessFn<O, V>>,
    error_fn: Option<ErrorFn<O>>,

    fire_immediately: bool,

    last_input: Option<I>,
    token: Option<CancelToken>,
    generation: u64,
    state: ReactionState,

    in_flight: FuturesUnordered<LocalBoxFuture<'static, Completion<V>>>,
}

impl<O, I, V> AbortableReaction<O, I, V> {
    pub fn state(&self) -> ReactionState {
        self.state
    }

    /// Number of derivations started so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.state == ReactionState::Running
    }

    /// Derivations started but not yet completed, including stale ones
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Cancels the derivation in flight, if any. Results that arrive
    /// afterwards are discarded.
    pub fn dispose(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        if self.state == ReactionState::Running {
            self.state = ReactionState::Aborted;
        }
    }
}

impl<O, I, V> Drop for AbortableReaction<O, I, V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<O, I, V> AbortableReaction<O, I, V>
where
    O: Alive,
    I: PartialEq + Clone + 'static,
    V: 'static,
{
    pub fn new<D, F, Fut>(name: impl Into<String>, data_fn: D, derive_fn: F) -> Self
    where
        D: Fn(&O) -> anyhow::Result<I> + 'static,
        F: Fn(I, CancelToken, &O) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<V>> + 'static,
    {
        Self {
            name: name.into(),
            data_fn: Box::new(data_fn),
            derive_fn: Box::new(move |input: I, token: CancelToken, owner: &O| {
                derive_fn(input, token, owner).boxed_local()
            }),
            started_fn: None,
            success_fn: None,
            error_fn: None,
            fire_immediately: true,
            last_input: None,
            token: None,
            generation: 0,
            state: ReactionState::Idle,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Called synchronously whenever a derivation starts
    pub fn on_started(mut self, f: impl FnMut(&mut O, &CancelToken) + 'static) -> Self {
        self.started_fn = Some(Box::new(f));
        self
    }

    pub fn on_success(mut self, f: impl FnMut(&mut O, V) + 'static) -> Self {
        self.success_fn = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&mut O, &anyhow::Error) + 'static) -> Self {
        self.error_fn = Some(Box::new(f));
        self
    }

    /// Whether the first `react` starts a derivation (the default), or
    /// only records the input
    pub fn fire_immediately(mut self, fire: bool) -> Self {
        self.fire_immediately = fire;
        self
    }

    /// Recomputes the input and starts a new derivation if it changed.
    /// Returns true if a derivation was started.
    pub fn react(&mut self, owner: &mut O) -> bool {
        let input = match (self.data_fn)(owner) {
            Ok(input) => input,
            Err(err) => {
                self.fail(owner, err);
                return false;
            }
        };

        let first = self.last_input.is_none();
        if self.last_input.as_ref() == Some(&input) {
            return false;
        }
        self.last_input = Some(input.clone());

        if first && !self.fire_immediately {
            return false;
        }

        self.trigger(owner, input)
    }

    fn trigger(&mut self, owner: &mut O, input: I) -> bool {
        if let Some(token) = self.token.take() {
            if self.state == ReactionState::Running {
                log::debug!("{}: cancelling run {}", self.name, self.generation);
            }
            token.cancel();
        }

        if !owner.is_alive() {
            self.state = ReactionState::Idle;
            return false;
        }

        let token = CancelToken::new();
        self.generation += 1;
        self.state = ReactionState::Running;
        self.token = Some(token.clone());

        if let Some(started) = self.started_fn.as_mut() {
            started(owner, &token);
        }

        let derivation = (self.derive_fn)(input, token.clone(), owner);
        let generation = self.generation;

        self.in_flight.push(
            async move {
                let result = derivation.await;
                Completion {
                    generation,
                    token,
                    result,
                }
            }
            .boxed_local(),
        );

        true
    }

    /// Drives the derivations in flight, delivering whichever finish.
    /// Ready once none are left.
    pub fn poll_completions(&mut self, owner: &mut O, cx: &mut Context<'_>) -> Poll<()> {
        loop {
            match self.in_flight.poll_next_unpin(cx) {
                Poll::Ready(Some(completion)) => self.complete(owner, completion),
                Poll::Ready(None) => return Poll::Ready(()),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    /// Waits for every derivation in flight to finish
    pub async fn settle(&mut self, owner: &mut O) {
        futures::future::poll_fn(|cx| self.poll_completions(owner, cx)).await
    }

    /// Delivers whatever can complete without waiting. Returns true if
    /// nothing is left in flight.
    pub fn run_until_stalled(&mut self, owner: &mut O) -> bool {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        self.poll_completions(owner, &mut cx).is_ready()
    }

    fn complete(&mut self, owner: &mut O, completion: Completion<V>) {
        let Completion {
            generation,
            token,
            result,
        } = completion;
        let current = generation == self.generation;

        match result {
            Ok(value) => {
                if token.is_cancelled() || !owner.is_alive() {
                    log::debug!("{}: discarding result of run {generation}", self.name);
                    if current {
                        self.state = ReactionState::Aborted;
                    }
                    return;
                }

                self.state = ReactionState::Succeeded;
                if let Some(success) = self.success_fn.as_mut() {
                    success(owner, value);
                }
            }
            Err(err) => {
                if token.is_cancelled() || is_aborted(&err) {
                    log::debug!("{}: run {generation} aborted", self.name);
                    if current {
                        self.state = ReactionState::Aborted;
                    }
                    return;
                }

                token.cancel();
                self.fail(owner, err);
            }
        }
    }

    fn fail(&mut self, owner: &mut O, err: anyhow::Error) {
        self.state = ReactionState::Failed;

        match self.error_fn.as_mut() {
            Some(on_error) if owner.is_alive() => on_error(owner, &err),
            _ => log::error!("{}: {err:?}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures::channel::oneshot;
    use futures::future::Either;

    use super::*;

    #[derive(Debug)]
    struct Panel {
        input: u32,
        alive: bool,
        loading: bool,
        results: Vec<u32>,
        errors: Vec<String>,
    }

    impl Panel {
        fn new(input: u32) -> Self {
            Self {
                input,
                alive: true,
                loading: false,
                results: Vec::new(),
                errors: Vec::new(),
            }
        }
    }

    impl Alive for Panel {
        fn is_alive(&self) -> bool {
            self.alive
        }
    }

    type Senders = Rc<RefCell<Vec<oneshot::Sender<u32>>>>;

    // derivations that finish when the test sends them a value
    fn scripted(senders: &Senders) -> AbortableReaction<Panel, u32, u32> {
        let senders = senders.clone();

        AbortableReaction::new(
            "scripted",
            |panel: &Panel| Ok(panel.input),
            move |input: u32, _token: CancelToken, _panel: &Panel| {
                let (tx, rx) = oneshot::channel::<u32>();
                senders.borrow_mut().push(tx);
                async move {
                    let value = rx.await?;
                    Ok::<_, anyhow::Error>(input * 100 + value)
                }
            },
        )
        .on_started(|panel, _| panel.loading = true)
        .on_success(|panel, value| {
            panel.loading = false;
            panel.results.push(value);
        })
        .on_error(|panel, err| panel.errors.push(err.to_string()))
    }

    fn send(senders: &Senders, index: usize, value: u32) {
        let tx = senders.borrow_mut().remove(index);
        // the receiver may already be gone
        let _ = tx.send(value);
    }

    #[test]
    fn latest_input_wins() {
        let senders = Senders::default();
        let mut reaction = scripted(&senders);
        let mut panel = Panel::new(1);

        assert!(reaction.react(&mut panel));
        assert!(panel.loading);
        panel.input = 2;
        assert!(reaction.react(&mut panel));
        panel.input = 3;
        assert!(reaction.react(&mut panel));
        assert_eq!(reaction.generation(), 3);

        // C completes before A and B
        send(&senders, 2, 7);
        assert!(!reaction.run_until_stalled(&mut panel));
        assert_eq!(panel.results, vec![307]);
        assert!(!panel.loading);
        assert_eq!(reaction.state(), ReactionState::Succeeded);

        send(&senders, 1, 8);
        send(&senders, 0, 9);
        assert!(reaction.run_until_stalled(&mut panel));

        assert_eq!(panel.results, vec![307]);
        assert!(panel.errors.is_empty());
        assert_eq!(reaction.state(), ReactionState::Succeeded);
    }

    #[test]
    fn unchanged_input_does_not_trigger() {
        let senders = Senders::default();
        let mut reaction = scripted(&senders);
        let mut panel = Panel::new(1);

        assert!(reaction.react(&mut panel));
        assert!(!reaction.react(&mut panel));
        assert_eq!(reaction.generation(), 1);
        assert_eq!(senders.borrow().len(), 1);
    }

    #[test]
    fn fire_immediately_off_waits_for_change() {
        let senders = Senders::default();
        let mut reaction = scripted(&senders).fire_immediately(false);
        let mut panel = Panel::new(1);

        assert!(!reaction.react(&mut panel));
        assert_eq!(reaction.state(), ReactionState::Idle);

        panel.input = 2;
        assert!(reaction.react(&mut panel));
        assert!(reaction.is_running());
    }

    #[test]
    fn errors_reach_callback() {
        let mut reaction = AbortableReaction::new(
            "failing",
            |panel: &Panel| Ok(panel.input),
            |_input: u32, _token: CancelToken, _panel: &Panel| async {
                Err::<u32, _>(anyhow::anyhow!("adapter exploded"))
            },
        )
        .on_error(|panel: &mut Panel, err| panel.errors.push(err.to_string()));

        let mut panel = Panel::new(1);
        reaction.react(&mut panel);
        assert!(reaction.run_until_stalled(&mut panel));

        assert_eq!(panel.errors, vec!["adapter exploded".to_string()]);
        assert_eq!(reaction.state(), ReactionState::Failed);
    }

    #[test]
    fn data_fn_errors_do_not_trigger() {
        let mut reaction = AbortableReaction::new(
            "bad input",
            |panel: &Panel| {
                if panel.input == 0 {
                    anyhow::bail!("no input");
                }
                Ok(panel.input)
            },
            |input: u32, _token: CancelToken, _panel: &Panel| async move {
                Ok::<_, anyhow::Error>(input)
            },
        )
        .on_error(|panel: &mut Panel, err| panel.errors.push(err.to_string()));

        let mut panel = Panel::new(0);
        assert!(!reaction.react(&mut panel));
        assert_eq!(panel.errors, vec!["no input".to_string()]);
        assert_eq!(reaction.generation(), 0);
        assert_eq!(reaction.state(), ReactionState::Failed);
    }

    #[test]
    fn aborts_are_not_errors() {
        let mut reaction = AbortableReaction::new(
            "aborting",
            |panel: &Panel| Ok(panel.input),
            |_input: u32, token: CancelToken, _panel: &Panel| async move {
                token.cancel();
                token.check()?;
                Ok::<u32, anyhow::Error>(0)
            },
        )
        .on_error(|panel: &mut Panel, err| panel.errors.push(err.to_string()));

        let mut panel = Panel::new(1);
        reaction.react(&mut panel);
        assert!(reaction.run_until_stalled(&mut panel));
        assert!(panel.errors.is_empty());
        assert_eq!(reaction.state(), ReactionState::Aborted);
    }

    #[test]
    fn cooperative_cancellation() {
        let senders = Senders::default();
        let pending = senders.clone();

        let mut reaction = AbortableReaction::new(
            "cooperative",
            |panel: &Panel| Ok(panel.input),
            move |_input: u32, token: CancelToken, _panel: &Panel| {
                let (tx, rx) = oneshot::channel::<u32>();
                pending.borrow_mut().push(tx);
                async move {
                    match futures::future::select(rx, token.cancelled()).await {
                        Either::Left((value, _)) => Ok::<u32, anyhow::Error>(value?),
                        Either::Right(((), _)) => Err(Aborted.into()),
                    }
                }
            },
        )
        .on_success(|panel: &mut Panel, value| panel.results.push(value))
        .on_error(|panel, err| panel.errors.push(err.to_string()));

        let mut panel = Panel::new(1);
        reaction.react(&mut panel);
        assert!(!reaction.run_until_stalled(&mut panel));

        // cancelling the first run lets it finish without a value
        panel.input = 2;
        reaction.react(&mut panel);
        assert!(!reaction.run_until_stalled(&mut panel));
        assert_eq!(reaction.in_flight(), 1);
        assert!(reaction.is_running());

        send(&senders, 1, 42);
        futures::executor::block_on(reaction.settle(&mut panel));

        assert_eq!(panel.results, vec![42]);
        assert!(panel.errors.is_empty());
    }

    #[test]
    fn dead_owner_gets_nothing() {
        let senders = Senders::default();
        let mut reaction = scripted(&senders);
        let mut panel = Panel::new(1);

        reaction.react(&mut panel);
        panel.alive = false;
        send(&senders, 0, 1);
        assert!(reaction.run_until_stalled(&mut panel));
        assert!(panel.results.is_empty());

        // changes while dead don't start anything
        panel.input = 2;
        assert!(!reaction.react(&mut panel));
        assert!(senders.borrow().is_empty());
        assert_eq!(reaction.generation(), 1);
    }

    #[test]
    fn dispose_cancels_in_flight() {
        let senders = Senders::default();
        let mut reaction = scripted(&senders);
        let mut panel = Panel::new(1);

        reaction.react(&mut panel);
        reaction.dispose();
        assert_eq!(reaction.state(), ReactionState::Aborted);

        send(&senders, 0, 1);
        assert!(reaction.run_until_stalled(&mut panel));
        assert!(panel.results.is_empty());
        assert!(panel.errors.is_empty());
    }

    #[test]
    fn dead_owner_errors_are_dropped() {
        let senders = Senders::default();
        let mut reaction = scripted(&senders);
        let mut panel = Panel::new(1);

        reaction.react(&mut panel);
        panel.alive = false;

        // dropping the sender fails the derivation
        senders.borrow_mut().clear();
        assert!(reaction.run_until_stalled(&mut panel));

        assert!(panel.errors.is_empty());
        assert_eq!(reaction.state(), ReactionState::Failed);

        // the same failure reaches a live owner
        let mut reaction = scripted(&senders);
        let mut panel = Panel::new(1);
        reaction.react(&mut panel);
        senders.borrow_mut().clear();
        assert!(reaction.run_until_stalled(&mut panel));
        assert_eq!(panel.errors.len(), 1);
    }

    #[test]
    fn dropping_cancels_in_flight() {
        let senders = Senders::default();
        let started = Rc::new(RefCell::new(None::<CancelToken>));

        let mut reaction = scripted(&senders).on_started({
            let started = started.clone();
            move |_panel: &mut Panel, token: &CancelToken| {
                *started.borrow_mut() = Some(token.clone());
            }
        });
        let mut panel = Panel::new(1);

        assert!(reaction.react(&mut panel));
        let token = started.borrow_mut().take().unwrap();
        assert!(!token.is_cancelled());

        drop(reaction);
        assert!(token.is_cancelled());
    }
}
