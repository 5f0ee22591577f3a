use tokio::sync::watch;

/// Process-wide cancellation, fanned out to every task.
///
/// The trigger side is held by the lifecycle controller; each task gets its
/// own cloned [`ShutdownSignal`].
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger(tx), ShutdownSignal(rx))
}

#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }

    #[cfg(test)]
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal(self.0.subscribe())
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    #[cfg(test)]
    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once shutdown is requested or the trigger is dropped.
    pub async fn wait(&mut self) {
        // wait_for checks the current value first, so a trigger that fired
        // before this call is not missed.
        let _ = self.0.wait_for(|stop| *stop).await;
    }
}
