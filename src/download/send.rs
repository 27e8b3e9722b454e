//! Streams a finished download to the HTTP client.
//!
//! The body owns the [`DownloadedFile`]. Once the last of `content_length`
//! bytes has been read the canonical file is deleted, before that chunk is
//! handed to hyper, which stops polling as soon as the declared length is
//! out. Anything else (read error, short file, client gone) drops the file
//! and the token guard sweeps instead. Either way it is removed exactly once.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream};
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::core::utils::{content_disposition, download_filename, format_bytes};
use crate::download::orchestrator::DownloadedFile;

/// File bytes followed by cleanup.
pub struct CleanupStream {
    inner: ReaderStream<File>,
    file: Option<DownloadedFile>,
    sent: u64,
    expected: u64,
    closing: Option<Closing>,
}

/// Delete in flight, holding back the final chunk until it is done.
struct Closing {
    last: Option<Bytes>,
    cleanup: BoxFuture<'static, ()>,
}

impl CleanupStream {
    pub fn new(reader: File, file: DownloadedFile) -> Self {
        Self {
            inner: ReaderStream::new(reader),
            expected: file.content_length,
            file: Some(file),
            sent: 0,
            closing: None,
        }
    }

    fn begin_cleanup(&mut self, file: DownloadedFile, last: Option<Bytes>) {
        log::info!("[Stream] Complete: {}", format_bytes(self.sent));
        self.closing = Some(Closing {
            last,
            cleanup: file.finish().boxed(),
        });
    }
}

impl Stream for CleanupStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(closing) = this.closing.as_mut() {
                ready!(closing.cleanup.poll_unpin(cx));
                let last = closing.last.take();
                this.closing = None;
                return Poll::Ready(last.map(Ok));
            }

            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(chunk)) => {
                    this.sent += chunk.len() as u64;
                    match this.file.take() {
                        Some(file) if this.sent >= this.expected => this.begin_cleanup(file, Some(chunk)),
                        file => {
                            this.file = file;
                            return Poll::Ready(Some(Ok(chunk)));
                        }
                    }
                }
                Some(Err(e)) => {
                    log::error!("[Stream Error] {}", e);
                    // Dropping the file sweeps its token.
                    this.file.take();
                    return Poll::Ready(Some(Err(e)));
                }
                None => match this.file.take() {
                    Some(file) if this.sent >= this.expected => this.begin_cleanup(file, None),
                    Some(_) => {
                        log::error!(
                            "[Stream Error] File ended after {} of {} bytes",
                            this.sent,
                            this.expected
                        );
                        return Poll::Ready(None);
                    }
                    None => return Poll::Ready(None),
                },
            }
        }
    }
}

/// Open the canonical file and build the streaming response.
///
/// An `Err` means nothing was sent yet; the caller answers 500. The file is
/// dropped with the error, so its token is swept.
pub async fn stream_download(file: DownloadedFile, title: Option<&str>) -> io::Result<Response> {
    let reader = File::open(&file.path).await?;
    let filename = download_filename(title, &file.extension);

    log::info!("[Stream] {} ({})", filename, format_bytes(file.content_length));

    let content_type = file.content_type;
    let content_length = file.content_length;
    let body = if content_length == 0 {
        // Nothing for the body to poll; clean up now.
        drop(reader);
        file.finish().await;
        Body::empty()
    } else {
        Body::from_stream(CleanupStream::new(reader, file))
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition(&filename))
        .header(header::CONTENT_LENGTH, content_length)
        .body(body)
        .map_err(io::Error::other)
}
