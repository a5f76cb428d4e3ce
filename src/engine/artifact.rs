// ==========================================
// 竞品目录匹配系统 - 临时文件管理
// ==========================================
// 职责: 为每次导入生成唯一命名的临时序列化文件，并保证删除
// 命名: import_<毫秒时间戳>_<进程内序号>_<uuid>.csv（固定目录下）
// 删除: release() 显式删除；未 release 时 Drop 兜底删除；
//       删除失败只记 warn，不影响导入结果
// ==========================================

use crate::importer::error::ImportResult;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

// ==========================================
// ArtifactManager - 临时文件工厂
// ==========================================
#[derive(Debug)]
pub struct ArtifactManager {
    dir: PathBuf,
    seq: AtomicU64,
}

impl ArtifactManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入字节并返回临时文件句柄
    ///
    /// # 返回
    /// - Ok(EphemeralArtifact): 已写入完成的文件
    /// - Err(FileIo): 目录创建或写入失败（已写出的部分会被删除）
    pub async fn acquire(&self, bytes: &[u8]) -> ImportResult<EphemeralArtifact> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let file_name = format!(
            "import_{}_{}_{}.csv",
            Utc::now().timestamp_millis(),
            seq,
            Uuid::new_v4().simple()
        );
        let path = self.dir.join(file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        // 文件已创建，之后任何失败都由 Drop 删除
        let artifact = EphemeralArtifact {
            path,
            released: false,
        };

        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        debug!(path = %artifact.path.display(), bytes = bytes.len(), "临时文件已创建");
        Ok(artifact)
    }
}

// ==========================================
// EphemeralArtifact - 临时文件句柄
// ==========================================
#[derive(Debug)]
pub struct EphemeralArtifact {
    path: PathBuf,
    released: bool,
}

impl EphemeralArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 删除临时文件（失败只记录日志）
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "临时文件已删除"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "临时文件已不存在")
            }
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "临时文件删除失败"
            ),
        }
    }
}

impl Drop for EphemeralArtifact {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "临时文件已在释放时删除"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "临时文件删除失败"
            ),
        }
    }
}
