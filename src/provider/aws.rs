use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::core::{BucketSummary, PublicAccessBlock};
use crate::provider::{CallerIdentity, ProviderError, StorageProvider};

const NO_PUBLIC_ACCESS_BLOCK: &str = "NoSuchPublicAccessBlockConfiguration";
const NO_WEBSITE_CONFIG: &str = "NoSuchWebsiteConfiguration";

pub struct AwsProvider {
    s3: aws_sdk_s3::Client,
    sts: aws_sdk_sts::Client,
}

impl AwsProvider {
    /// Clients over the ambient credential chain (env, shared config, IMDS).
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::from_config(&config)
    }

    /// Clients over a named profile from the shared config/credentials files.
    pub async fn for_profile(profile: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .load()
            .await;
        Self::from_config(&config)
    }

    fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self {
            s3: aws_sdk_s3::Client::new(config),
            sts: aws_sdk_sts::Client::new(config),
        }
    }
}

fn request_error<E>(err: SdkError<E>) -> ProviderError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ProviderError::Request(format!("{}", DisplayErrorContext(&err)))
}

fn config_error<E>(err: SdkError<E>, absent_code: &str) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.as_service_error().and_then(ProvideErrorMetadata::code);
    if code == Some(absent_code) {
        ProviderError::ConfigurationAbsent
    } else {
        request_error(err)
    }
}

impl StorageProvider for AwsProvider {
    async fn caller_identity(&self) -> Result<CallerIdentity, ProviderError> {
        let resp = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(request_error)?;

        let account_id = resp
            .account()
            .ok_or_else(|| {
                ProviderError::Request("caller identity response missing account id".to_string())
            })?
            .to_string();
        let arn = resp
            .arn()
            .ok_or_else(|| {
                ProviderError::Request("caller identity response missing ARN".to_string())
            })?
            .to_string();

        Ok(CallerIdentity { account_id, arn })
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ProviderError> {
        let mut buckets = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self.s3.list_buckets();
            if let Some(token) = continuation.take() {
                req = req.continuation_token(token);
            }
            let resp = req.send().await.map_err(request_error)?;

            for bucket in resp.buckets() {
                if let Some(name) = bucket.name() {
                    buckets.push(BucketSummary {
                        name: name.to_string(),
                    });
                }
            }

            match resp.continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(buckets)
    }

    async fn public_access_block(
        &self,
        bucket: &str,
    ) -> Result<PublicAccessBlock, ProviderError> {
        let resp = self
            .s3
            .get_public_access_block()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| config_error(err, NO_PUBLIC_ACCESS_BLOCK))?;

        let config = resp
            .public_access_block_configuration()
            .ok_or(ProviderError::ConfigurationAbsent)?;

        // An unset flag is not an enabled flag.
        Ok(PublicAccessBlock {
            block_public_acls: config.block_public_acls().unwrap_or(false),
            ignore_public_acls: config.ignore_public_acls().unwrap_or(false),
            block_public_policy: config.block_public_policy().unwrap_or(false),
            restrict_public_buckets: config.restrict_public_buckets().unwrap_or(false),
        })
    }

    async fn bucket_website(&self, bucket: &str) -> Result<bool, ProviderError> {
        match self.s3.get_bucket_website().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => Err(config_error(err, NO_WEBSITE_CONFIG)),
        }
    }

    async fn list_object_keys(&self, bucket: &str) -> Result<Vec<String>, ProviderError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self.s3.list_objects_v2().bucket(bucket);
            if let Some(token) = continuation.take() {
                req = req.continuation_token(token);
            }
            let resp = req.send().await.map_err(request_error)?;

            for object in resp.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated() == Some(true) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }
}
