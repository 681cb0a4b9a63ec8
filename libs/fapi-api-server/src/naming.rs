use std::net::SocketAddr;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

/// Подставляется в имя файла, если адрес клиента определить не удалось.
pub const UNKNOWN_ADDR: &str = "unknown";

/// Верхняя граница (не включительно) случайного суффикса имени файла.
pub const SUFFIX_RANGE: u32 = 10_000;

/// Максимальная длина адреса в имени файла (в символах). Длиннее
/// обрезается, иначе имя упирается в NAME_MAX файловой системы.
pub const MAX_ADDR_LEN: usize = 64;

const FORWARDED_FOR: &str = "x-forwarded-for";

// ═══════════════════════════════════════════════════════════════
//  Payload classification
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Json,
    Text,
}

impl PayloadKind {
    /// Синтаксически валидный JSON → `Json`, всё остальное → `Text`.
    /// Невалидный JSON не отклоняется, а сохраняется как есть.
    pub fn classify(payload: &[u8]) -> Self {
        match serde_json::from_slice::<serde::de::IgnoredAny>(payload) {
            Ok(_) => PayloadKind::Json,
            Err(_) => PayloadKind::Text,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            PayloadKind::Json => "json",
            PayloadKind::Text => "txt",
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Client address
// ═══════════════════════════════════════════════════════════════

/// Адрес клиента для имени файла.
///
/// Первый элемент `X-Forwarded-For`, иначе IP peer'а транспорта.
/// Результат уже санитизирован и обрезан до `MAX_ADDR_LEN`; пустой
/// адрес заменяется на `unknown`.
pub fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    let raw = match forwarded {
        Some(list) => list.split(',').next().map(str::trim).unwrap_or_default().to_string(),
        None => peer.map(|p| p.ip().to_string()).unwrap_or_default(),
    };

    let clean: String = sanitize_addr(&raw).chars().take(MAX_ADDR_LEN).collect();
    if clean.is_empty() {
        UNKNOWN_ADDR.to_string()
    } else {
        clean
    }
}

/// Заменить символы, небезопасные для имени файла, на `_`.
pub fn sanitize_addr(addr: &str) -> String {
    addr.chars()
        .map(|c| match c {
            ':' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════
//  File name
// ═══════════════════════════════════════════════════════════════

/// `<addr>-<YYYY-MM-DD-HH_MM_SS.nnnnnnnnn>-<suffix>.<ext>`
///
/// Коллизии не исключены: два запроса с одного адреса в один тик
/// часов с одинаковым суффиксом перезапишут друг друга.
pub fn payload_filename(addr: &str, at: DateTime<Utc>, suffix: u32, kind: PayloadKind) -> String {
    format!(
        "{addr}-{}-{suffix}.{}",
        at.format("%Y-%m-%d-%H_%M_%S%.9f"),
        kind.extension()
    )
}

pub fn random_suffix() -> u32 {
    use rand::Rng;
    rand::thread_rng().gen_range(0..SUFFIX_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    fn headers(xff: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(FORWARDED_FOR, HeaderValue::from_str(xff).unwrap());
        h
    }

    #[test]
    fn classify_json_and_text() {
        assert_eq!(PayloadKind::classify(br#"{"a":1}"#), PayloadKind::Json);
        assert_eq!(PayloadKind::classify(b"[1, 2, 3]\n"), PayloadKind::Json);
        assert_eq!(PayloadKind::classify(b"42"), PayloadKind::Json);
        assert_eq!(PayloadKind::classify(b"not json"), PayloadKind::Text);
        assert_eq!(PayloadKind::classify(br#"{"a":1"#), PayloadKind::Text);
        assert_eq!(PayloadKind::classify(br#"{"a":1} trailing"#), PayloadKind::Text);
        assert_eq!(PayloadKind::classify(b""), PayloadKind::Text);
    }

    #[test]
    fn forwarded_for_takes_first_entry_trimmed() {
        let peer: SocketAddr = "10.1.1.1:5000".parse().unwrap();
        assert_eq!(client_addr(&headers(" 203.0.113.7 , 10.0.0.1"), Some(peer)), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_peer_ip() {
        let peer: SocketAddr = "[::1]:5000".parse().unwrap();
        assert_eq!(client_addr(&HeaderMap::new(), Some(peer)), "__1");
    }

    #[test]
    fn missing_address_becomes_unknown() {
        assert_eq!(client_addr(&HeaderMap::new(), None), UNKNOWN_ADDR);
        assert_eq!(client_addr(&headers(" , 10.0.0.1"), None), UNKNOWN_ADDR);
    }

    #[test]
    fn long_forwarded_for_is_truncated() {
        let addr = client_addr(&headers(&"a".repeat(300)), None);
        assert_eq!(addr, "a".repeat(MAX_ADDR_LEN));

        let name = payload_filename(&addr, Utc::now(), SUFFIX_RANGE - 1, PayloadKind::Json);
        assert!(name.len() < 255, "{} bytes", name.len());
    }

    #[test]
    fn sanitize_replaces_path_separators() {
        assert_eq!(sanitize_addr("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_addr("../../etc"), ".._.._etc");
    }

    #[test]
    fn filename_layout() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap()
            + chrono::Duration::nanoseconds(1_234);
        assert_eq!(
            payload_filename("127.0.0.1", at, 42, PayloadKind::Json),
            "127.0.0.1-2024-03-09-07_05_02.000001234-42.json"
        );
        assert_eq!(
            payload_filename("unknown", at, 0, PayloadKind::Text),
            "unknown-2024-03-09-07_05_02.000001234-0.txt"
        );
    }

    #[test]
    fn suffix_stays_in_range() {
        for _ in 0..1_000 {
            assert!(random_suffix() < SUFFIX_RANGE);
        }
    }
}
