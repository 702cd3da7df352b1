use log::{debug, warn};
use rusoto_core::request::{HttpClient, TlsError};
use rusoto_credential::{CredentialsError, DefaultCredentialsProvider};
use rusoto_s3::{ListObjectsV2Output, ListObjectsV2Request, S3Client, S3};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::Config;
use crate::errors::SelectorError;

/// S3 never returns more than this many keys per page
const MAX_PAGE_SIZE: usize = 1000;

#[derive(Error, Debug)]
pub enum FileServerError {
    #[error("cannot create S3 http client")]
    HttpClientError(#[from] TlsError),
    #[error("failed to obtain S3 credentials")]
    CredentialsError(#[from] CredentialsError),
}

pub struct FileServer {
    pub bucket: String,
    pub client: Box<dyn S3 + Send + Sync>,
    pub max_keys: Option<usize>,
    pub attempt_timeout: Duration,
    pub retry_backoff: Duration,
}

impl FileServer {
    pub fn new(config: &Config) -> Result<FileServer, FileServerError> {
        let dispatcher = HttpClient::new()?;
        let credentials = DefaultCredentialsProvider::new()?;
        let client = S3Client::new_with(dispatcher, credentials, config.region.clone());

        Ok(FileServer::with_client(client, config))
    }

    pub fn with_client<C>(client: C, config: &Config) -> FileServer
    where
        C: S3 + Send + Sync + 'static,
    {
        FileServer {
            bucket: config.bucket.clone(),
            client: Box::new(client),
            max_keys: config.max_keys,
            attempt_timeout: config.attempt_timeout,
            retry_backoff: config.retry_backoff,
        }
    }

    /// Enumerate the bucket keys, one page after the other, until S3 says
    /// there are no more or `max_keys` is reached.
    pub async fn list_keys(&self, deadline: Instant) -> Result<Vec<String>, SelectorError> {
        let mut keys: Vec<String> = Vec::new();
        let mut continuation_token = None;

        loop {
            let page_size = match self.max_keys {
                Some(cap) if keys.len() >= cap => break,
                Some(cap) => Some((cap - keys.len()).min(MAX_PAGE_SIZE) as i64),
                None => None,
            };

            let request = ListObjectsV2Request {
                bucket: self.bucket.clone(),
                continuation_token: continuation_token.take(),
                max_keys: page_size,
                ..Default::default()
            };

            let page = self.list_page(request, deadline).await?;

            keys.extend(
                page.contents
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|obj| obj.key),
            );

            match (page.is_truncated, page.next_continuation_token) {
                (Some(true), Some(token)) => continuation_token = Some(token),
                _ => break,
            }
        }

        if let Some(cap) = self.max_keys {
            keys.truncate(cap);
        }

        debug!("found {} keys in bucket {}", keys.len(), self.bucket);
        Ok(keys)
    }

    async fn list_page(
        &self,
        request: ListObjectsV2Request,
        deadline: Instant,
    ) -> Result<ListObjectsV2Output, SelectorError> {
        match self.try_list_page(request.clone(), deadline).await {
            Err(e) if e.is_transient() && Instant::now() + self.retry_backoff < deadline => {
                warn!(
                    "listing bucket {} failed ({}), retrying in {:?}",
                    self.bucket, e, self.retry_backoff
                );
                tokio::time::delay_for(self.retry_backoff).await;
                self.try_list_page(request, deadline).await
            }
            res => res,
        }
    }

    async fn try_list_page(
        &self,
        request: ListObjectsV2Request,
        deadline: Instant,
    ) -> Result<ListObjectsV2Output, SelectorError> {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or_default();

        if remaining == Duration::from_secs(0) {
            return Err(SelectorError::StorageTimeout);
        }

        tokio::time::timeout(
            remaining.min(self.attempt_timeout),
            self.client.list_objects_v2(request),
        )
        .await
        .map_err(|_| SelectorError::StorageTimeout)?
        .map_err(SelectorError::StorageUnavailable)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::FileServer;
    use crate::config::Config;
    use crate::errors::SelectorError;
    use rusoto_core::request::{HttpDispatchError, HttpResponse};
    use rusoto_core::signature::SignedRequest;
    use rusoto_core::DispatchSignedRequest;
    use rusoto_mock::{MockCredentialsProvider, MockRequestDispatcher, MultipleMockRequestDispatcher};
    use rusoto_s3::S3Client;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Never answers the first call, then behaves like `then`
    struct HangsOnce {
        calls: Arc<AtomicUsize>,
        then: MockRequestDispatcher,
    }

    impl DispatchSignedRequest for HangsOnce {
        fn dispatch(
            &self,
            request: SignedRequest,
            timeout: Option<Duration>,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpDispatchError>> + Send>> {
            let response = self.then.dispatch(request, timeout);

            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Box::pin(async move {
                    tokio::time::delay_for(Duration::from_secs(60)).await;
                    response.await
                })
            } else {
                response
            }
        }
    }

    /// A `ListObjectsV2` response body holding `keys`
    pub(crate) fn list_page_body(keys: &[&str], next_token: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|key| {
                format!(
                    "<Contents><Key>{}</Key><Size>42</Size><StorageClass>STANDARD</StorageClass></Contents>",
                    key
                )
            })
            .collect();

        let truncation = match next_token {
            Some(token) => format!(
                "<IsTruncated>true</IsTruncated><NextContinuationToken>{}</NextContinuationToken>",
                token
            ),
            None => "<IsTruncated>false</IsTruncated>".to_string(),
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>notdrills</Name><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys>{}{}</ListBucketResult>"#,
            keys.len(),
            truncation,
            contents
        )
    }

    fn test_config() -> Config {
        Config {
            retry_backoff: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn file_server<D>(dispatcher: D, config: &Config) -> FileServer
    where
        D: DispatchSignedRequest + Send + Sync + 'static,
    {
        let client = S3Client::new_with(dispatcher, MockCredentialsProvider, config.region.clone());
        FileServer::with_client(client, config)
    }

    fn counting(dispatcher: MockRequestDispatcher, counter: &Arc<AtomicUsize>) -> MockRequestDispatcher {
        let counter = counter.clone();
        dispatcher.with_request_checker(move |_: &SignedRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[actix_rt::test]
    async fn follows_continuation_tokens() {
        let dispatcher = MultipleMockRequestDispatcher::new(vec![
            MockRequestDispatcher::with_status(200)
                .with_body(&list_page_body(&["a.png", "b.jpg"], Some("page-2"))),
            MockRequestDispatcher::with_status(200)
                .with_body(&list_page_body(&["c.gif"], None))
                .with_request_checker(|req: &SignedRequest| {
                    assert_eq!(
                        Some(&Some("page-2".to_string())),
                        req.params.get("continuation-token")
                    );
                }),
        ]);
        let fs = file_server(dispatcher, &test_config());

        let keys = fs.list_keys(deadline()).await.unwrap();

        assert_eq!(vec!["a.png", "b.jpg", "c.gif"], keys);
    }

    #[actix_rt::test]
    async fn stops_at_max_keys() {
        let requests = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting(
            MockRequestDispatcher::with_status(200)
                .with_body(&list_page_body(&["a.png", "b.jpg", "c.gif"], Some("page-2"))),
            &requests,
        );
        let config = Config {
            max_keys: Some(2),
            ..test_config()
        };
        let fs = file_server(dispatcher, &config);

        let keys = fs.list_keys(deadline()).await.unwrap();

        assert_eq!(vec!["a.png", "b.jpg"], keys);
        assert_eq!(1, requests.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn empty_bucket_yields_no_keys() {
        let dispatcher = MockRequestDispatcher::with_status(200).with_body(&list_page_body(&[], None));
        let fs = file_server(dispatcher, &test_config());

        let keys = fs.list_keys(deadline()).await.unwrap();

        assert!(keys.is_empty());
    }

    #[actix_rt::test]
    async fn retries_once_on_server_errors() {
        let requests = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting(MockRequestDispatcher::with_status(503), &requests);
        let fs = file_server(dispatcher, &test_config());

        let res = fs.list_keys(deadline()).await;

        assert!(matches!(res, Err(SelectorError::StorageUnavailable(_))));
        assert_eq!(2, requests.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn recovers_from_a_single_server_error() {
        let dispatcher = MultipleMockRequestDispatcher::new(vec![
            MockRequestDispatcher::with_status(500),
            MockRequestDispatcher::with_status(200).with_body(&list_page_body(&["a.png"], None)),
        ]);
        let fs = file_server(dispatcher, &test_config());

        let keys = fs.list_keys(deadline()).await.unwrap();

        assert_eq!(vec!["a.png"], keys);
    }

    #[actix_rt::test]
    async fn does_not_retry_on_forbidden() {
        let requests = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting(MockRequestDispatcher::with_status(403), &requests);
        let fs = file_server(dispatcher, &test_config());

        let res = fs.list_keys(deadline()).await;

        assert!(matches!(res, Err(SelectorError::StorageUnavailable(_))));
        assert_eq!(1, requests.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn expired_deadline_times_out_without_calling_s3() {
        let requests = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting(
            MockRequestDispatcher::with_status(200).with_body(&list_page_body(&["a.png"], None)),
            &requests,
        );
        let fs = file_server(dispatcher, &test_config());

        let res = fs.list_keys(Instant::now()).await;

        assert!(matches!(res, Err(SelectorError::StorageTimeout)));
        assert_eq!(0, requests.load(Ordering::SeqCst));
    }

    #[actix_rt::test]
    async fn retries_a_call_that_hangs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = HangsOnce {
            calls: calls.clone(),
            then: MockRequestDispatcher::with_status(200)
                .with_body(&list_page_body(&["a.png"], None)),
        };
        let config = Config {
            attempt_timeout: Duration::from_millis(50),
            ..test_config()
        };
        let fs = file_server(dispatcher, &config);

        let keys = fs.list_keys(deadline()).await.unwrap();

        assert_eq!(vec!["a.png"], keys);
        assert_eq!(2, calls.load(Ordering::SeqCst));
    }
}
