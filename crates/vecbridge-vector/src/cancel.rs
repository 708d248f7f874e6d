//! 取消支持
//!
//! 丢弃 future 即可中止进行中的客户端调用；`Cancellable` 把外部的
//! `CancellationToken` 转换为 `VecBridgeError::Cancelled`。

use std::future::Future;
use tokio_util::sync::CancellationToken;

use vecbridge_core::{Result, VecBridgeError};

pub trait Cancellable<T>: Future<Output = Result<T>> + Sized {
    /// 令牌被取消时立即返回 `Cancelled`，并丢弃内部操作
    fn cancellable(self, token: &CancellationToken) -> impl Future<Output = Result<T>> + Send
    where
        Self: Send,
        T: Send,
    {
        async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("Operation cancelled");
                    Err(VecBridgeError::Cancelled)
                }
                result = self => result,
            }
        }
    }
}

impl<T, F> Cancellable<T> for F where F: Future<Output = Result<T>> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let value = async { Ok::<_, VecBridgeError>(7) }.cancellable(&token).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();

        let result = async { Ok::<_, VecBridgeError>(()) }.cancellable(&token).await;
        assert!(matches!(result, Err(VecBridgeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, VecBridgeError>(())
        }
        .cancellable(&token)
        .await;
        assert!(matches!(result, Err(VecBridgeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let token = CancellationToken::new();
        let result: Result<()> = async { Err(VecBridgeError::NotFound("h1".to_string())) }
            .cancellable(&token)
            .await;
        assert!(result.unwrap_err().is_not_found());
    }
}
