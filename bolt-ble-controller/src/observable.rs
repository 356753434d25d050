use tokio::sync::watch;

/// A value with change notifications
///
/// Backed by a `tokio::sync::watch` channel: one producer (the manager),
/// any number of subscribers, each seeing the latest value.
#[derive(Debug)]
pub struct Observable<T> {
    sender: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    pub fn new(value: T) -> Self {
        let (sender, _) = watch::channel(value);
        Self { sender }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Replace the value and wake subscribers, whether or not any exist
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        self.sender.send_modify(f);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_the_latest_value() {
        let scanning = Observable::new(false);
        let mut rx = scanning.subscribe();

        scanning.set(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());

        scanning.modify(|v| *v = false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
        assert!(!scanning.get());
    }

    #[test]
    fn set_without_subscribers_is_kept() {
        let locks: Observable<Vec<u8>> = Observable::default();
        locks.set(vec![1, 2]);
        locks.modify(|v| v.push(3));
        assert_eq!(locks.get(), vec![1, 2, 3]);
    }
}
