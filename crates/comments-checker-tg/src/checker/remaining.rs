use crate::error::IoError;
use crate::{err, err_ctx, Result};
use std::io;
use std::path::{Path, PathBuf};
use teloxide::types::ChatId;

/// Plain text file with the channels that were not checked yet, one username
/// per line. The file is rewritten after every checked channel, so it always
/// reflects the work that is still pending.
#[derive(Debug, Clone)]
pub(crate) struct RemainingWorkFile {
    path: PathBuf,
}

impl RemainingWorkFile {
    pub(crate) fn for_chat(data_dir: &Path, chat_id: ChatId) -> Self {
        Self {
            path: data_dir.join(format!("unchecked_{}.txt", chat_id.0)),
        }
    }

    pub(crate) async fn write<'a>(&self, usernames: impl IntoIterator<Item = &'a String>) -> Result {
        let content: String = usernames
            .into_iter()
            .flat_map(|username| [username.as_str(), "\n"])
            .collect();

        fs_err::tokio::write(&self.path, content)
            .await
            .map_err(err_ctx!(IoError::WriteRemainingWork))
    }

    /// Returns an empty list if the file doesn't exist
    pub(crate) async fn read(&self) -> Result<Vec<String>> {
        let content = match fs_err::tokio::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => return Err(err!(IoError::ReadRemainingWork { source })),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = RemainingWorkFile::for_chat(dir.path(), ChatId(1));

        assert!(file.read().await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let file = RemainingWorkFile::for_chat(dir.path(), ChatId(-42));

        let first = ["@a".to_owned(), "@b".to_owned(), "@c".to_owned()];
        file.write(&first).await.unwrap();
        assert_eq!(file.read().await.unwrap(), first);

        file.write(&first[1..]).await.unwrap();
        assert_eq!(file.read().await.unwrap(), ["@b", "@c"]);

        file.write([]).await.unwrap();
        assert!(file.read().await.unwrap().is_empty());

        let on_disk = std::fs::read_to_string(dir.path().join("unchecked_-42.txt")).unwrap();
        assert_eq!(on_disk, "");
    }
}
