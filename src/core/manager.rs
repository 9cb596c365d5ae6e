//! Download task manager
//!
//! Tracks download tasks, enforces the concurrency limit with a semaphore
//! and broadcasts every state change over an event channel. Events both
//! drive the task map (so it stays the single source of truth) and feed
//! whatever frontend is listening.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{RwLock, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::downloader::{DownloaderConfig, HttpDownloader};
use crate::core::models::{
    AppError, AppResult, DownloadConfig, DownloadOption, DownloadStats, DownloadTask,
    PlaylistProgress, ProgressUpdate, TaskStatus,
};
use crate::core::playlist::PlaylistDownloader;
use crate::core::retry::RetryPolicy;
use crate::core::source::VideoSource;
use crate::core::video::VideoDownloader;
use crate::utils::url::{classify, video_id, UrlKind};

/// Events broadcast by the manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DownloadEvent {
    TaskCreated {
        task_id: String,
        task: DownloadTask,
    },
    TaskStarted {
        task_id: String,
    },
    TaskProgress {
        task_id: String,
        progress: ProgressUpdate,
    },
    TaskPlaylistProgress {
        task_id: String,
        progress: PlaylistProgress,
    },
    TaskCompleted {
        task_id: String,
        file_path: String,
    },
    TaskFailed {
        task_id: String,
        error: String,
    },
    TaskCancelled {
        task_id: String,
    },
    StatsUpdated {
        stats: DownloadStats,
    },
}

pub type EventSender = UnboundedSender<DownloadEvent>;
pub type EventReceiver = UnboundedReceiver<DownloadEvent>;

type TaskMap = Arc<RwLock<HashMap<String, DownloadTask>>>;

/// Manager owning the task map, event channel and concurrency limit
pub struct DownloadManager {
    config: Arc<RwLock<DownloadConfig>>,
    tasks: TaskMap,
    cancel_flags: Arc<RwLock<HashMap<String, Arc<AtomicBool>>>>,
    stats: Arc<RwLock<DownloadStats>>,
    event_sender: EventSender,
    event_receiver: Option<EventReceiver>,
    semaphore: Arc<Semaphore>,
    http: Arc<HttpDownloader>,
    source: Arc<dyn VideoSource>,
}

impl DownloadManager {
    pub fn new(config: DownloadConfig, source: Arc<dyn VideoSource>) -> AppResult<Self> {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let http = Arc::new(HttpDownloader::new(&DownloaderConfig::from(&config))?);
        let semaphore = Arc::new(Semaphore::new(config.concurrent_downloads));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            tasks: Arc::new(RwLock::new(HashMap::new())),
            cancel_flags: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(DownloadStats::default())),
            event_sender,
            event_receiver: Some(event_receiver),
            semaphore,
            http,
            source,
        })
    }

    /// Take the event stream. Can only be taken once.
    pub fn subscribe(&mut self) -> Option<EventReceiver> {
        self.event_receiver.take()
    }

    /// Create a new pending task.
    ///
    /// URLs already tracked by a non-terminal task are rejected.
    pub async fn add_task(
        &self,
        url: &str,
        option: DownloadOption,
        output_dir: PathBuf,
    ) -> AppResult<String> {
        classify(url)?;

        // Duplicates are matched by video id where one can be extracted,
        // so youtu.be and watch?v= spellings of one video collide.
        let new_id = video_id(url);
        {
            let tasks = self.tasks.read().await;
            let duplicate = tasks.values().any(|t| {
                let same_target =
                    t.url == url || (new_id.is_some() && video_id(&t.url) == new_id);
                same_target
                    && matches!(t.status, TaskStatus::Pending | TaskStatus::Downloading)
            });
            if duplicate {
                return Err(AppError::Download(format!(
                    "URL is already being downloaded: {url}"
                )));
            }
        }

        let now = Utc::now();
        let task = DownloadTask {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            title: url.to_string(),
            option,
            output_dir,
            status: TaskStatus::Pending,
            progress: 0.0,
            file_size: None,
            downloaded_size: 0,
            speed: 0.0,
            eta: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        let task_id = task.id.clone();

        self.emit(DownloadEvent::TaskCreated {
            task_id: task_id.clone(),
            task,
        })
        .await;

        info!("Task {} created for {}", task_id, url);
        Ok(task_id)
    }

    /// Start a pending task. Fails when the concurrency limit is reached.
    pub async fn start_download(&self, task_id: &str) -> AppResult<()> {
        let task = {
            let tasks = self.tasks.read().await;
            tasks
                .get(task_id)
                .cloned()
                .ok_or_else(|| AppError::Download(format!("Task not found: {task_id}")))?
        };

        match task.status {
            TaskStatus::Pending | TaskStatus::Failed => {}
            TaskStatus::Downloading => return Ok(()),
            _ => {
                return Err(AppError::Download(format!(
                    "Task {task_id} is not startable"
                )))
            }
        }

        let permit = self
            .semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| AppError::Download("Maximum concurrent downloads reached".to_string()))?;

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flags
            .write()
            .await
            .insert(task_id.to_string(), Arc::clone(&cancel));

        let retry = {
            let config = self.config.read().await;
            RetryPolicy::from_attempts(config.retry_attempts)
        };

        let tasks = Arc::clone(&self.tasks);
        let stats = Arc::clone(&self.stats);
        let cancel_flags = Arc::clone(&self.cancel_flags);
        let sender = self.event_sender.clone();
        let http = Arc::clone(&self.http);
        let source = Arc::clone(&self.source);
        let task_id = task_id.to_string();

        tokio::spawn(async move {
            emit_event(
                &tasks,
                &stats,
                &sender,
                DownloadEvent::TaskStarted {
                    task_id: task_id.clone(),
                },
            )
            .await;

            let result =
                run_task(&task, &tasks, &stats, &sender, http, source, retry, cancel).await;

            // The permit must be free before the terminal event goes out:
            // listeners start their next queued task in response to it.
            drop(permit);
            cancel_flags.write().await.remove(&task_id);

            let event = match result {
                Ok(path) => {
                    info!("Task {} completed: {}", task_id, path.display());
                    DownloadEvent::TaskCompleted {
                        task_id: task_id.clone(),
                        file_path: path.display().to_string(),
                    }
                }
                Err(AppError::Cancelled) => {
                    info!("Task {} cancelled", task_id);
                    DownloadEvent::TaskCancelled {
                        task_id: task_id.clone(),
                    }
                }
                Err(e) => {
                    error!("Task {} failed: {}", task_id, e);
                    DownloadEvent::TaskFailed {
                        task_id: task_id.clone(),
                        error: e.to_string(),
                    }
                }
            };
            emit_event(&tasks, &stats, &sender, event).await;

            let stats_snapshot = stats.read().await.clone();
            let _ = sender.send(DownloadEvent::StatsUpdated {
                stats: stats_snapshot,
            });
        });

        Ok(())
    }

    /// Request cancellation of a task.
    ///
    /// Pending tasks are cancelled immediately; active downloads stop at
    /// the next chunk boundary.
    pub async fn cancel_download(&self, task_id: &str) -> AppResult<()> {
        let status = {
            let tasks = self.tasks.read().await;
            tasks
                .get(task_id)
                .map(|t| t.status.clone())
                .ok_or_else(|| AppError::Download(format!("Task not found: {task_id}")))?
        };

        match status {
            TaskStatus::Downloading => {
                if let Some(flag) = self.cancel_flags.read().await.get(task_id) {
                    flag.store(true, Ordering::Relaxed);
                }
                Ok(())
            }
            TaskStatus::Pending => {
                self.emit(DownloadEvent::TaskCancelled {
                    task_id: task_id.to_string(),
                })
                .await;
                Ok(())
            }
            _ => Err(AppError::Download(format!(
                "Task {task_id} is not cancellable"
            ))),
        }
    }

    /// Remove a task from the map. Active downloads must be cancelled first.
    pub async fn remove_task(&self, task_id: &str) -> AppResult<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.get(task_id) {
            None => Err(AppError::Download(format!("Task not found: {task_id}"))),
            Some(task) if task.status == TaskStatus::Downloading => Err(AppError::Download(
                "Cannot remove an active download".to_string(),
            )),
            Some(_) => {
                tasks.remove(task_id);
                drop(tasks);
                warn!("Task {} removed", task_id);
                Ok(())
            }
        }
    }

    /// Drop all completed and cancelled tasks, returning how many were removed
    pub async fn clear_completed(&self) -> usize {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, t| {
            !matches!(t.status, TaskStatus::Completed | TaskStatus::Cancelled)
        });
        before - tasks.len()
    }

    /// Reset all failed tasks to pending, returning their ids
    pub async fn retry_failed(&self) -> Vec<String> {
        let mut tasks = self.tasks.write().await;
        let mut ids = Vec::new();
        for task in tasks.values_mut() {
            if task.status == TaskStatus::Failed {
                task.status = TaskStatus::Pending;
                task.error_message = None;
                task.progress = 0.0;
                task.downloaded_size = 0;
                task.updated_at = Utc::now();
                ids.push(task.id.clone());
            }
        }
        ids
    }

    pub async fn get_task(&self, task_id: &str) -> Option<DownloadTask> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// All tasks, newest first
    pub async fn get_tasks(&self) -> Vec<DownloadTask> {
        let mut tasks: Vec<DownloadTask> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    pub async fn get_stats(&self) -> DownloadStats {
        self.stats.read().await.clone()
    }

    pub async fn get_config(&self) -> DownloadConfig {
        self.config.read().await.clone()
    }

    /// Replace the download configuration.
    ///
    /// The concurrency limit is adjusted by adding or forgetting permits;
    /// a reduction only takes effect as running downloads finish.
    pub async fn update_config(&self, new_config: DownloadConfig) {
        let old_limit = {
            let mut config = self.config.write().await;
            let old = config.concurrent_downloads;
            *config = new_config.clone();
            old
        };

        let new_limit = new_config.concurrent_downloads;
        if new_limit > old_limit {
            self.semaphore.add_permits(new_limit - old_limit);
        } else {
            for _ in new_limit..old_limit {
                if let Ok(permit) = self.semaphore.try_acquire() {
                    permit.forget();
                }
            }
        }
    }

    async fn emit(&self, event: DownloadEvent) {
        emit_event(&self.tasks, &self.stats, &self.event_sender, event).await;
    }
}

/// Apply an event's side effects to the task map, then broadcast it
async fn emit_event(
    tasks: &RwLock<HashMap<String, DownloadTask>>,
    stats: &RwLock<DownloadStats>,
    sender: &EventSender,
    event: DownloadEvent,
) {
    apply_event(tasks, stats, &event).await;
    let _ = sender.send(event);
}

async fn apply_event(
    tasks: &RwLock<HashMap<String, DownloadTask>>,
    stats: &RwLock<DownloadStats>,
    event: &DownloadEvent,
) {
    {
        let mut tasks = tasks.write().await;
        let now = Utc::now();
        match event {
            DownloadEvent::TaskCreated { task_id, task } => {
                tasks.insert(task_id.clone(), task.clone());
            }
            DownloadEvent::TaskStarted { task_id } => {
                if let Some(task) = tasks.get_mut(task_id) {
                    task.status = TaskStatus::Downloading;
                    task.error_message = None;
                    task.updated_at = now;
                }
            }
            DownloadEvent::TaskProgress { task_id, progress } => {
                if let Some(task) = tasks.get_mut(task_id) {
                    task.progress = progress.percent;
                    task.downloaded_size = progress.downloaded_bytes;
                    task.file_size = progress.total_bytes.or(task.file_size);
                    task.speed = progress.speed;
                    task.eta = progress.eta_seconds;
                    task.updated_at = now;
                }
            }
            DownloadEvent::TaskPlaylistProgress { task_id, progress } => {
                if let Some(task) = tasks.get_mut(task_id) {
                    if progress.total > 0 {
                        task.progress =
                            progress.completed as f64 / progress.total as f64 * 100.0;
                    }
                    task.updated_at = now;
                }
            }
            DownloadEvent::TaskCompleted { task_id, .. } => {
                if let Some(task) = tasks.get_mut(task_id) {
                    task.status = TaskStatus::Completed;
                    task.progress = 100.0;
                    task.speed = 0.0;
                    task.eta = None;
                    task.updated_at = now;
                }
            }
            DownloadEvent::TaskFailed { task_id, error } => {
                if let Some(task) = tasks.get_mut(task_id) {
                    task.status = TaskStatus::Failed;
                    task.error_message = Some(error.clone());
                    task.speed = 0.0;
                    task.eta = None;
                    task.updated_at = now;
                }
            }
            DownloadEvent::TaskCancelled { task_id } => {
                if let Some(task) = tasks.get_mut(task_id) {
                    task.status = TaskStatus::Cancelled;
                    task.speed = 0.0;
                    task.eta = None;
                    task.updated_at = now;
                }
            }
            DownloadEvent::StatsUpdated { .. } => {}
        }
    }

    recompute_stats(tasks, stats).await;
}

async fn recompute_stats(
    tasks: &RwLock<HashMap<String, DownloadTask>>,
    stats: &RwLock<DownloadStats>,
) {
    let tasks = tasks.read().await;
    let mut fresh = DownloadStats {
        total_tasks: tasks.len(),
        ..Default::default()
    };

    let mut active_speed = 0.0;
    for task in tasks.values() {
        match task.status {
            TaskStatus::Completed => fresh.completed_tasks += 1,
            TaskStatus::Failed => fresh.failed_tasks += 1,
            TaskStatus::Downloading => {
                fresh.active_downloads += 1;
                active_speed += task.speed;
            }
            _ => {}
        }
        fresh.total_downloaded += task.downloaded_size;
    }
    if fresh.active_downloads > 0 {
        fresh.average_speed = active_speed / fresh.active_downloads as f64;
    }

    *stats.write().await = fresh;
}

/// Run the actual transfer for a task, video or playlist
#[allow(clippy::too_many_arguments)]
async fn run_task(
    task: &DownloadTask,
    tasks: &TaskMap,
    stats: &Arc<RwLock<DownloadStats>>,
    sender: &EventSender,
    http: Arc<HttpDownloader>,
    source: Arc<dyn VideoSource>,
    retry: RetryPolicy,
    cancel: Arc<AtomicBool>,
) -> AppResult<PathBuf> {
    match classify(&task.url)? {
        UrlKind::Video => {
            let session =
                VideoDownloader::new(source.as_ref(), &task.url, http, retry).await?;

            {
                let mut tasks = tasks.write().await;
                if let Some(tracked) = tasks.get_mut(&task.id) {
                    tracked.title = session.info().title.clone();
                }
            }

            let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();
            let forward_tasks = Arc::clone(tasks);
            let forward_stats = Arc::clone(stats);
            let forward_sender = sender.clone();
            let forward_id = task.id.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(mut update) = rx.recv().await {
                    update.task_id = forward_id.clone();
                    emit_event(
                        &forward_tasks,
                        &forward_stats,
                        &forward_sender,
                        DownloadEvent::TaskProgress {
                            task_id: forward_id.clone(),
                            progress: update,
                        },
                    )
                    .await;
                }
            });

            let result = session
                .download(&task.option, &task.output_dir, cancel, Some(tx))
                .await;
            let _ = forwarder.await;
            result
        }
        UrlKind::Playlist => {
            let session =
                PlaylistDownloader::new(source.as_ref(), &task.url, http, retry).await?;

            {
                let mut tasks = tasks.write().await;
                if let Some(tracked) = tasks.get_mut(&task.id) {
                    tracked.title = session.playlist().title.clone();
                }
            }

            let (tx, mut rx) = mpsc::unbounded_channel::<PlaylistProgress>();
            let forward_tasks = Arc::clone(tasks);
            let forward_stats = Arc::clone(stats);
            let forward_sender = sender.clone();
            let forward_id = task.id.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(progress) = rx.recv().await {
                    emit_event(
                        &forward_tasks,
                        &forward_stats,
                        &forward_sender,
                        DownloadEvent::TaskPlaylistProgress {
                            task_id: forward_id.clone(),
                            progress,
                        },
                    )
                    .await;
                }
            });

            let result = session
                .download_all(&task.option, &task.output_dir, cancel, Some(tx))
                .await;
            let _ = forwarder.await;
            result
        }
    }
}
