use crate::domain::model::HttpResponse;
use crate::utils::error::Result;
use std::path::Path;

/// Blocking HTTP capability used by the client.
///
/// Implementations decide connection lifetime (pooled session or one client
/// per call); callers never branch on it. `token` is sent as
/// `Authorization: JWT <token>` when present.
pub trait Transport {
    fn get(&self, url: &str, token: Option<&str>) -> Result<HttpResponse>;

    fn post_form(
        &self,
        url: &str,
        token: Option<&str>,
        fields: &[(String, String)],
    ) -> Result<HttpResponse>;

    /// Multipart POST with the form fields and `file` attached as part `file`.
    fn post_multipart(
        &self,
        url: &str,
        token: Option<&str>,
        fields: &[(String, String)],
        file: &Path,
    ) -> Result<HttpResponse>;

    /// Streams the body of `url` into `dest` (overwriting) and returns the byte count.
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}
