//! Worker pool for blocking socket work.
//!
//! Accept, connect, the read loop, and every send run as tasks in one
//! growable pool so the negotiator task never waits on the network. The pool
//! is shut down once, aborting whatever is still running.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, info};

pub struct WorkerPool {
    tasks: Mutex<Option<JoinSet<()>>>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Some(JoinSet::new())),
        }
    }

    /// Spawn `task`. Returns `None` (dropping the task) once the pool has
    /// been shut down.
    pub fn spawn<F>(&self, task: F) -> Option<AbortHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(set) = guard.as_mut() else {
            debug!("worker pool shut down, dropping task");
            return None;
        };
        // Reap finished tasks so the set only holds live work.
        while set.try_join_next().is_some() {}
        Some(set.spawn(task))
    }

    /// Number of tasks not yet reaped.
    pub fn active(&self) -> usize {
        let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(set) => {
                while set.try_join_next().is_some() {}
                set.len()
            }
            None => 0,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Abort every task and refuse new ones. Returns `false` if the pool was
    /// already shut down.
    pub fn shutdown(&self) -> bool {
        let taken = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match taken {
            Some(mut set) => {
                info!(tasks = set.len(), "shutting down worker pool");
                set.abort_all();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn spawned_tasks_run() {
        let pool = WorkerPool::new();
        let (tx, rx) = oneshot::channel();
        pool.spawn(async move {
            let _ = tx.send(7);
        })
        .unwrap();
        assert_eq!(rx.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn shutdown_aborts_running_tasks() {
        let pool = WorkerPool::new();
        let (tx, rx) = oneshot::channel::<()>();
        pool.spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let _ = tx.send(());
        })
        .unwrap();

        assert!(pool.shutdown());
        // Aborting drops the sender without sending.
        assert!(tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .unwrap()
            .is_err());
    }

    #[tokio::test]
    async fn shutdown_is_once() {
        let pool = WorkerPool::new();
        assert!(pool.shutdown());
        assert!(!pool.shutdown());
        assert!(pool.is_shut_down());
        assert!(pool.spawn(async {}).is_none());
        assert_eq!(pool.active(), 0);
    }

    #[tokio::test]
    async fn finished_tasks_are_reaped() {
        let pool = WorkerPool::new();
        for _ in 0..10 {
            pool.spawn(async {}).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.active(), 0);
    }
}
