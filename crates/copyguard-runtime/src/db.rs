use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};

use copyguard_core::error::CopyguardError;
use copyguard_core::models::{ApiStatus, VideoRecord};
use copyguard_core::storage::Storage;

/// Async handle to a [`Storage`] owned by a dedicated thread.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::UnboundedSender<DbCommand>,
}

type Reply<T> = oneshot::Sender<Result<T, CopyguardError>>;

enum DbCommand {
    ExistingVideoIds {
        platform: String,
        video_ids: Vec<String>,
        reply: Reply<HashSet<String>>,
    },
    InsertNewVideos {
        videos: Vec<VideoRecord>,
        reply: Reply<usize>,
    },
    VideosToRecheck {
        min_days: i64,
        max_days: i64,
        today: NaiveDate,
        reply: Reply<Vec<VideoRecord>>,
    },
    UpdateVideoStatus {
        platform: String,
        video_id: String,
        status: ApiStatus,
        checked: NaiveDate,
        blocked_regions: Vec<String>,
        reply: Reply<bool>,
    },
    DeleteRemovedVideos {
        reply: Reply<usize>,
    },
    VideosFirstSeenOn {
        date: NaiveDate,
        reply: Reply<Vec<VideoRecord>>,
    },
    VideosInWindow {
        from: NaiveDate,
        before: NaiveDate,
        reply: Reply<Vec<VideoRecord>>,
    },
    SetIgnoreReason {
        platform: String,
        video_ids: Vec<String>,
        reason: String,
        reply: Reply<usize>,
    },
    CountVideos {
        reply: Reply<usize>,
    },
}

impl DbHandle {
    pub fn open(path: &Path) -> Option<Self> {
        let storage = Storage::open(path)
            .map_err(|e| tracing::error!("Failed to open database: {e}"))
            .ok()?;
        Self::spawn(storage)
    }

    /// Handle to a fresh in-memory database.
    pub fn open_memory() -> Option<Self> {
        let storage = Storage::open_memory()
            .map_err(|e| tracing::error!("Failed to open in-memory database: {e}"))
            .ok()?;
        Self::spawn(storage)
    }

    fn spawn(storage: Storage) -> Option<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("db-actor".into())
            .spawn(move || actor_loop(storage, rx))
            .map_err(|e| tracing::error!("Failed to spawn DB thread: {e}"))
            .ok()?;

        Some(Self { tx })
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> DbCommand,
    ) -> Result<T, CopyguardError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(make(reply));
        rx.await
            .unwrap_or_else(|_| Err(CopyguardError::Config("DB actor closed".into())))
    }

    pub async fn existing_video_ids(
        &self,
        platform: &str,
        video_ids: Vec<String>,
    ) -> Result<HashSet<String>, CopyguardError> {
        let platform = platform.to_string();
        self.request(|reply| DbCommand::ExistingVideoIds {
            platform,
            video_ids,
            reply,
        })
        .await
    }

    pub async fn insert_new_videos(&self, videos: Vec<VideoRecord>) -> Result<usize, CopyguardError> {
        self.request(|reply| DbCommand::InsertNewVideos { videos, reply })
            .await
    }

    pub async fn videos_to_recheck(
        &self,
        min_days: i64,
        max_days: i64,
        today: NaiveDate,
    ) -> Result<Vec<VideoRecord>, CopyguardError> {
        self.request(|reply| DbCommand::VideosToRecheck {
            min_days,
            max_days,
            today,
            reply,
        })
        .await
    }

    pub async fn update_video_status(
        &self,
        platform: &str,
        video_id: &str,
        status: ApiStatus,
        checked: NaiveDate,
        blocked_regions: Vec<String>,
    ) -> Result<bool, CopyguardError> {
        let platform = platform.to_string();
        let video_id = video_id.to_string();
        self.request(|reply| DbCommand::UpdateVideoStatus {
            platform,
            video_id,
            status,
            checked,
            blocked_regions,
            reply,
        })
        .await
    }

    pub async fn delete_removed_videos(&self) -> Result<usize, CopyguardError> {
        self.request(|reply| DbCommand::DeleteRemovedVideos { reply })
            .await
    }

    pub async fn videos_first_seen_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<VideoRecord>, CopyguardError> {
        self.request(|reply| DbCommand::VideosFirstSeenOn { date, reply })
            .await
    }

    pub async fn videos_in_window(
        &self,
        from: NaiveDate,
        before: NaiveDate,
    ) -> Result<Vec<VideoRecord>, CopyguardError> {
        self.request(|reply| DbCommand::VideosInWindow { from, before, reply })
            .await
    }

    pub async fn set_ignore_reason(
        &self,
        platform: &str,
        video_ids: Vec<String>,
        reason: &str,
    ) -> Result<usize, CopyguardError> {
        let platform = platform.to_string();
        let reason = reason.to_string();
        self.request(|reply| DbCommand::SetIgnoreReason {
            platform,
            video_ids,
            reason,
            reply,
        })
        .await
    }

    pub async fn count_videos(&self) -> Result<usize, CopyguardError> {
        self.request(|reply| DbCommand::CountVideos { reply }).await
    }
}

fn actor_loop(storage: Storage, mut rx: mpsc::UnboundedReceiver<DbCommand>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            DbCommand::ExistingVideoIds {
                platform,
                video_ids,
                reply,
            } => {
                let _ = reply.send(storage.existing_video_ids(&platform, &video_ids));
            }
            DbCommand::InsertNewVideos { videos, reply } => {
                let _ = reply.send(storage.insert_new_videos(&videos));
            }
            DbCommand::VideosToRecheck {
                min_days,
                max_days,
                today,
                reply,
            } => {
                let _ = reply.send(storage.videos_to_recheck(min_days, max_days, today));
            }
            DbCommand::UpdateVideoStatus {
                platform,
                video_id,
                status,
                checked,
                blocked_regions,
                reply,
            } => {
                let _ = reply.send(storage.update_video_status(
                    &platform,
                    &video_id,
                    status,
                    checked,
                    &blocked_regions,
                ));
            }
            DbCommand::DeleteRemovedVideos { reply } => {
                let _ = reply.send(storage.delete_removed_videos());
            }
            DbCommand::VideosFirstSeenOn { date, reply } => {
                let _ = reply.send(storage.videos_first_seen_on(date));
            }
            DbCommand::VideosInWindow {
                from,
                before,
                reply,
            } => {
                let _ = reply.send(storage.videos_in_window(from, before));
            }
            DbCommand::SetIgnoreReason {
                platform,
                video_ids,
                reason,
                reply,
            } => {
                let _ = reply.send(storage.set_ignore_reason(&platform, &video_ids, &reason));
            }
            DbCommand::CountVideos { reply } => {
                let _ = reply.send(storage.count_videos());
            }
        }
    }
}
