//! HTTP Digest authentication (RFC 7616, MD5 family) for the graph CRUD endpoint.

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Only `auth` is supported; `auth-int` offers are ignored.
    pub qop: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestChallenge {
    /// Parses a challenge header. Returns `None` for other schemes.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop = None;
        let mut algorithm = None;

        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "algorithm" => algorithm = Some(value),
                "qop" => {
                    if value.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")) {
                        qop = Some("auth".to_string());
                    }
                }
                _ => {}
            }
        }

        Some(Self {
            realm: realm.unwrap_or_default(),
            nonce: nonce?,
            opaque,
            qop,
            algorithm,
        })
    }

    fn is_sess(&self) -> bool {
        self.algorithm
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("MD5-sess"))
    }

    /// Builds the `Authorization` header value for one request.
    ///
    /// `uri` is the request target (path plus query) exactly as sent.
    pub fn authorization(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        nc: u32,
        cnonce: &str,
    ) -> String {
        let mut ha1 = md5_hex(&format!("{}:{}:{}", username, self.realm, password));
        if self.is_sess() {
            ha1 = md5_hex(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = md5_hex(&format!("{}:{}", method, uri));
        let nc_value = format!("{:08x}", nc);

        let response = match &self.qop {
            Some(qop) => md5_hex(&format!(
                "{}:{}:{}:{}:{}:{}",
                ha1, self.nonce, nc_value, cnonce, qop, ha2
            )),
            None => md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2)),
        };

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}""#,
            username, self.realm, self.nonce, uri, response
        );
        if let Some(algorithm) = &self.algorithm {
            header.push_str(&format!(", algorithm={}", algorithm));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{}""#, opaque));
        }
        if let Some(qop) = &self.qop {
            header.push_str(&format!(r#", qop={}, nc={}, cnonce="{}""#, qop, nc_value, cnonce));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Splits `k1="v, 1", k2=v2` into pairs, honouring quoted commas.
fn split_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = params.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim().trim_start_matches(',').trim().to_string();
        rest = rest[eq + 1..].trim_start();

        let value;
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"').unwrap_or(quoted.len());
            value = quoted[..end].to_string();
            rest = quoted.get(end + 1..).unwrap_or("");
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            value = rest[..end].trim().to_string();
            rest = &rest[end..];
        }
        rest = rest.trim_start().trim_start_matches(',').trim_start();

        if !key.is_empty() {
            pairs.push((key, value));
        }
    }

    pairs
}
