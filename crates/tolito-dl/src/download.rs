use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use tracing::debug;
use ureq::{
    http::{header::CONTENT_LENGTH, Response},
    Body,
};

use crate::{
    error::{DownloadError, IoContext, Result},
    http::Http,
    types::{Progress, TransferMeter},
};

type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

/// A single HTTP GET written to a file.
///
/// The body is streamed to `<output>.part` and renamed into place once complete, so a
/// failed transfer never leaves a truncated file at `output`.
pub struct Download {
    url: String,
    output: Option<PathBuf>,
    on_progress: Option<ProgressCallback>,
}

impl Download {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output: None,
            on_progress: None,
        }
    }

    /// Destination file. Defaults to the last path segment of the URL in the working
    /// directory.
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Registers a callback invoked on start, at most every 200 ms while data arrives,
    /// and on completion.
    pub fn progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// Runs the transfer and returns the number of bytes written.
    pub fn execute(self) -> Result<u64> {
        let parsed = url::Url::parse(&self.url).map_err(|source| {
            DownloadError::InvalidUrl {
                url: self.url.clone(),
                source,
            }
        })?;

        let output = match &self.output {
            Some(output) => output.clone(),
            None => filename_from_url(&parsed).ok_or(DownloadError::NoFilename)?,
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .io_context(|| format!("creating directory {}", parent.display()))?;
        }

        let part = part_path(&output);
        let result = self.transfer(&part);
        match result {
            Ok(size) => {
                fs::rename(&part, &output)
                    .io_context(|| format!("moving download into {}", output.display()))?;
                debug!(url = self.url, size, "download complete");
                Ok(size)
            }
            Err(err) => {
                let _ = fs::remove_file(&part);
                Err(err)
            }
        }
    }

    fn transfer(&self, path: &Path) -> Result<u64> {
        let resp = Http::fetch(&self.url)?;
        let total = parse_content_length(&resp);
        self.emit(Progress::Starting { total });

        let mut file =
            File::create(path).io_context(|| format!("creating {}", path.display()))?;
        let mut reader = resp.into_body().into_reader();
        let mut buffer = [0u8; 16384];
        let mut downloaded = 0u64;
        let mut meter = TransferMeter::new(Instant::now());

        loop {
            let n = reader
                .read(&mut buffer)
                .io_context(|| format!("reading {}", self.url))?;
            if n == 0 {
                break;
            }

            file.write_all(&buffer[..n])
                .io_context(|| format!("writing {}", path.display()))?;
            downloaded += n as u64;

            if let Some(speed) = meter.sample(downloaded, Instant::now()) {
                self.emit(Progress::Chunk {
                    current: downloaded,
                    total,
                    speed,
                });
            }
        }

        file.flush()
            .io_context(|| format!("flushing {}", path.display()))?;

        if downloaded == 0 {
            return Err(DownloadError::EmptyBody {
                url: self.url.clone(),
            });
        }

        self.emit(Progress::Complete { total: downloaded });
        Ok(downloaded)
    }

    fn emit(&self, progress: Progress) {
        if let Some(cb) = &self.on_progress {
            cb(progress);
        }
    }
}

fn filename_from_url(url: &url::Url) -> Option<PathBuf> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(PathBuf::from)
}

fn part_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn parse_content_length(resp: &Response<Body>) -> u64 {
    resp.headers()
        .get(CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|len| len.parse::<u64>().ok())
        .unwrap_or(0)
}
