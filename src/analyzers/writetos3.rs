use serde::Serialize;
use tracing::info;

/// Object key for a report under an optional prefix, e.g. `austin/2019/report.json`.
pub fn report_key(prefix: Option<&str>, file_name: &str) -> String {
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{file_name}"),
        None => file_name.to_string(),
    }
}

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
#[tracing::instrument(skip(client, value))]
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> anyhow::Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    let bytes = body.len();

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await?;

    info!(bytes, "Report uploaded");
    Ok(())
}
