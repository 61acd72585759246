//! Token pools shared by the grammar and the mutators.
//!
//! The pools are treated as versioned configuration data. The built-in set is
//! [`Dictionary::default`]; operators can replace it with a JSON file holding
//! the same fields.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DICTIONARY_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Failed to read dictionary file at {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse dictionary JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Dictionary version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Dictionary pool '{0}' is empty")]
    EmptyPool(&'static str),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct Dictionary {
    pub version: u32,
    /// Operation names the generator draws from.
    pub commands: Vec<String>,
    /// Option keywords and subcommand names.
    pub options: Vec<String>,
    /// Generic tokens: boundary numbers, float edge cases, odd strings.
    pub tokens: Vec<String>,
    pub keys: Vec<String>,
    pub fields: Vec<String>,
    pub values: Vec<String>,
    pub groups: Vec<String>,
    pub consumers: Vec<String>,
    pub patterns: Vec<String>,
    pub channels: Vec<String>,
}

impl Dictionary {
    pub fn from_json_str(json: &str) -> Result<Self, DictionaryError> {
        let dictionary: Dictionary = serde_json::from_str(json)?;
        dictionary.validate()?;
        Ok(dictionary)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, DictionaryError> {
        let content = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Every pool must be non-empty so that picks are total.
    pub fn validate(&self) -> Result<(), DictionaryError> {
        if self.version != DICTIONARY_VERSION {
            return Err(DictionaryError::UnsupportedVersion {
                found: self.version,
                expected: DICTIONARY_VERSION,
            });
        }
        let pools: [(&'static str, &Vec<String>); 10] = [
            ("commands", &self.commands),
            ("options", &self.options),
            ("tokens", &self.tokens),
            ("keys", &self.keys),
            ("fields", &self.fields),
            ("values", &self.values),
            ("groups", &self.groups),
            ("consumers", &self.consumers),
            ("patterns", &self.patterns),
            ("channels", &self.channels),
        ];
        for (name, pool) in pools {
            if pool.is_empty() {
                return Err(DictionaryError::EmptyPool(name));
            }
        }
        Ok(())
    }

    /// Generic tokens followed by the option keywords.
    pub fn token<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        pick_across(rng, &[&self.tokens, &self.options])
    }

    /// Any string from the generic and typed pools; the string mutator's
    /// wholesale-replacement source.
    pub fn any_string<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        pick_across(
            rng,
            &[
                &self.tokens,
                &self.options,
                &self.keys,
                &self.fields,
                &self.values,
                &self.groups,
                &self.consumers,
            ],
        )
    }

    /// Source for argument insertion; option keywords are only mixed in when
    /// `with_options` is set.
    pub fn insertable<R: Rng + ?Sized>(&self, rng: &mut R, with_options: bool) -> &str {
        if with_options {
            pick_across(
                rng,
                &[
                    &self.tokens,
                    &self.options,
                    &self.keys,
                    &self.fields,
                    &self.values,
                    &self.options,
                ],
            )
        } else {
            pick_across(
                rng,
                &[
                    &self.tokens,
                    &self.options,
                    &self.keys,
                    &self.fields,
                    &self.values,
                ],
            )
        }
    }
}

/// Uniform pick from one pool; empty pools yield `""`.
pub fn pick<'a, R, S>(rng: &mut R, pool: &'a [S]) -> &'a str
where
    R: Rng + ?Sized,
    S: AsRef<str>,
{
    match pool.choose(rng) {
        Some(item) => item.as_ref(),
        None => "",
    }
}

/// Uniform pick over the concatenation of several pools.
pub fn pick_across<'a, R: Rng + ?Sized>(rng: &mut R, pools: &[&'a Vec<String>]) -> &'a str {
    let total: usize = pools.iter().map(|pool| pool.len()).sum();
    if total == 0 {
        return "";
    }
    let mut index = rng.random_range(0..total);
    for pool in pools {
        if index < pool.len() {
            return &pool[index];
        }
        index -= pool.len();
    }
    ""
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

impl Default for Dictionary {
    fn default() -> Self {
        let mut tokens = owned(BASE_TOKENS);
        tokens.push("B".repeat(64));
        tokens.push("C".repeat(256));
        Self {
            version: DICTIONARY_VERSION,
            commands: owned(COMMANDS),
            options: owned(OPTIONS),
            tokens,
            keys: owned(KEYS),
            fields: owned(FIELDS),
            values: owned(VALUES),
            groups: owned(GROUPS),
            consumers: owned(CONSUMERS),
            patterns: owned(PATTERNS),
            channels: owned(CHANNELS),
        }
    }
}

const BASE_TOKENS: &[&str] = &[
    "", "0", "1", "-1", "2", "7", "8", "9", "15", "16", "31", "32", "63", "64", "127", "128",
    "255", "256", "511", "512", "1023", "1024", "4096", "65535", "2147483647", "-2147483648",
    "9223372036854775807", "-9223372036854775808", "NaN", "Inf", "-Inf", "1e309", "-1e309",
    "A", "AA", "AAAA", "hello", "world", "fuzz", "FUZZ", "\u{1F608}", "key", "k", "mykey",
    "dolly", "clone", "zz", "myhash", "field", "field1", "field2", "value", "value1", "value2",
    "QQQQQQQQ", "IDS", "COUNT", "BLOCK", "MKSTREAM", "JUSTID", "NOMKSTREAM", "OK", "ERR", "nil",
    "null",
];

const KEYS: &[&str] = &[
    "k", "k1", "k2", "key", "mykey", "dolly", "clone", "zz", "myhash", "list", "set", "zset",
    "stream", "mystream", "3418133648", "3779513606",
];

const FIELDS: &[&str] = &["f", "f1", "f2", "aa", "bb", "field", "field1", "field2"];

const VALUES: &[&str] = &[
    "v", "v1", "v2", "1337", "Hello", "World", "HelloWorld", "99", "-256", "sheep",
];

const GROUPS: &[&str] = &["g", "mygroup", "group", "3779513606"];

const CONSUMERS: &[&str] = &["c", "myconsumer", "consumer"];

const PATTERNS: &[&str] = &[
    "*", "k*", "user:*", "zz*", "stream*", "??", "[a-z]*", "\\x00*", ".*",
];

const CHANNELS: &[&str] = &["chan", "news", "updates", "pub", "sub", "x", "test"];

const OPTIONS: &[&str] = &[
    // common modifiers
    "NX", "XX", "CH", "INCR", "GT", "LT", "WITHSCORES", "LIMIT", "COUNT", "BLOCK", "ASC",
    "DESC", "ALPHA", "STORE", "STOREDIST", "BY", "GET", "MATCH", "TYPE", "WEIGHTS",
    "AGGREGATE", "SUM", "MIN", "MAX", "REV", "BYLEX", "BYSCORE",
    // streams
    "MKSTREAM", "NOMKSTREAM", "JUSTID", "NOACK", "FORCE", "IDLE", "TIME", "RETRYCOUNT",
    "LASTID", "ENTRIESADDED", "ENTRIESREAD", "GROUP", "GROUPS", "CONSUMERS", "STREAM",
    "STREAMS", "CREATE", "CREATECONSUMER", "DELCONSUMER", "DESTROY", "SETID",
    // pubsub
    "CHANNELS", "NUMSUB", "NUMPAT", "SHARDCHANNELS", "SHARDNUMSUB",
    // acl
    "ON", "OFF", "ALLKEYS", "RESETKEYS", "~*", "ALLCHANNELS", "RESETCHANNELS", "&*",
    "ALLCOMMANDS", "+@ALL", "NOCOMMANDS", "-@ALL", "NOPASS", "RESETPASS", "SETUSER", "DELUSER",
    "GETUSER", "LIST", "USERS", "WHOAMI", "LOAD", "SAVE", "CAT", "GENPASS", "LOG",
    // client
    "KILL", "ID", "ADDR", "LADDR", "USER", "SKIPME", "YES", "NO", "REPLY", "SKIP", "PAUSE",
    "UNPAUSE", "WRITE", "ALL", "TRACKING", "REDIRECT", "BCAST", "OPTIN", "OPTOUT", "NOLOOP",
    "PREFIX", "CACHING", "GETREDIR", "TRACKINGINFO",
    // config
    "SET", "RESETSTAT", "REWRITE", "BIND", "DIR", "LOGFILE", "INCLUDE", "NOSAVE",
    "RENAME-COMMAND", "CLIENT-OUTPUT-BUFFER-LIMIT", "OOM-SCORE-ADJ-VALUES",
    "NOTIFY-KEYSPACE-EVENTS", "LOADMODULE", "SENTINEL",
    // debug
    "SEGFAULT", "PANIC", "OOM", "ASSERT", "RESTART", "CRASH-AND-RECOVER", "LEAK", "RELOAD",
    "MERGE", "NOFLUSH", "OBJECT", "SDSLEN", "ZIPLIST", "POPULATE", "DIGEST", "DIGEST-VALUE",
    "PROTOCOL", "STRING", "INTEGER", "DOUBLE", "BIGNUM", "NULL", "ARRAY", "MAP", "ATTRIB",
    "PUSH", "TRUE", "FALSE", "VERBATIM", "SLEEP", "ERROR", "STRUCTSIZE", "HTSTATS",
    "HTSTATS-KEY", "CHANGE-REPL-ID",
    // cluster
    "MEET", "NODES", "MYID", "SLOTS", "FLUSHSLOTS", "ADDSLOTS", "DELSLOTS", "SETSLOT",
    "MIGRATING", "IMPORTING", "STABLE", "NODE", "BUMPEPOCH", "INFO", "SAVECONFIG", "KEYSLOT",
    "COUNTKEYSINSLOT", "GETKEYSINSLOT", "FORGET", "REPLICATE", "SLAVES", "REPLICAS",
    "COUNT-FAILURE-REPORTS", "FAILOVER", "TAKEOVER", "SET-CONFIG-EPOCH", "RESET", "HARD",
    "SOFT",
    // geo
    "WITHDIST", "WITHHASH", "WITHCOORD", "ANY", "FROMMEMBER", "FROMLONLAT", "BYRADIUS",
    "BYBOX",
    // scripting
    "FLUSH", "SYNC", "ASYNC", "EXISTS", "DEBUG", "HELP", "STEP", "NEXT", "CONTINUE", "TRACE",
    "MAXLEN", "BREAK", "EVAL", "ABORT", "REDIS", "PRINT", "WHOLE",
    // replication
    "ACK", "GETACK", "CAPA", "EOF", "PSYNC2", "RDB-ONLY", "LISTENING-PORT", "IP-ADDRESS",
    "TIMEOUT", "TO",
    // memory / object
    "REFCOUNT", "ENCODING", "IDLETIME", "FREQ", "USAGE", "SAMPLES", "STATS", "MALLOC-STATS",
    "DOCTOR", "PURGE",
    // sentinel
    "MONITOR", "DOWN-AFTER-MILLISECONDS", "FAILOVER-TIMEOUT", "PARALLEL-SYNCS",
    "NOTIFICATION-SCRIPT", "CLIENT-RECONFIG-SCRIPT", "AUTH-PASS", "AUTH-USER", "QUORUM",
    "CURRENT-EPOCH", "LEADER-EPOCH", "KNOWN-SLAVE", "KNOWN-REPLICA", "KNOWN-SENTINEL",
    "ANNOUNCE-IP", "ANNOUNCE-PORT", "DENY-SCRIPTS-RECONFIG", "SENTINEL-USER",
    "SENTINEL-PASS", "RESOLVE-HOSTNAMES", "ANNOUNCE-HOSTNAMES", "MASTERS", "MASTER",
    "SENTINELS", "IS-MASTER-DOWN-BY-ADDR", "PENDING-SCRIPTS", "FLUSHCONFIG", "REMOVE",
    "CKQUORUM", "SIMULATE-FAILURE", "CRASH-AFTER-ELECTION", "CRASH-AFTER-PROMOTION",
    // units
    "B", "K", "KB", "M", "MB", "G", "GB",
];

const COMMANDS: &[&str] = &[
    "acl", "append", "asking", "auth", "bgrewriteaof", "bgsave", "bitcount", "bitfield",
    "bitfield_ro", "bitop", "bitpos", "blmove", "blpop", "brpop", "brpoplpush", "bzpopmax",
    "bzpopmin", "client", "cluster", "command", "config", "copy", "dbsize", "debug", "decr",
    "decrby", "del", "discard", "dump", "echo", "eval", "evalsha", "exec", "exists", "expire",
    "expireat", "failover", "flushall", "flushdb", "geoadd", "geodist", "geohash", "geopos",
    "georadius", "georadiusbymember", "georadiusbymember_ro", "georadius_ro", "geosearch",
    "geosearchstore", "get", "getbit", "getdel", "getex", "getrange", "getset", "hdel", "hello",
    "hexists", "hget", "hgetall", "hincrby", "hincrbyfloat", "hkeys", "hlen", "hmget", "hmset",
    "host:", "hrandfield", "hscan", "hset", "hsetnx", "hstrlen", "hvals", "incr", "incrby",
    "incrbyfloat", "info", "keys", "lastsave", "latency", "lindex", "linsert", "llen", "lmove",
    "lolwut", "lpop", "lpos", "lpush", "lpushx", "lrange", "lrem", "lset", "ltrim", "memory",
    "mget", "migrate", "module", "monitor", "move", "mset", "msetnx", "multi", "object",
    "persist", "pexpire", "pexpireat", "pfadd", "pfcount", "pfdebug", "pfmerge", "pfselftest",
    "ping", "post", "psetex", "psubscribe", "psync", "pttl", "publish", "pubsub",
    "punsubscribe", "randomkey", "readonly", "readwrite", "rename", "renamenx", "replconf",
    "replicaof", "reset", "restore", "restore-asking", "role", "rpop", "rpoplpush", "rpush",
    "rpushx", "sadd", "save", "scan", "scard", "script", "sdiff", "sdiffstore", "select", "set",
    "setbit", "setex", "setnx", "setrange", "shutdown", "sinter", "sinterstore", "sismember",
    "slaveof", "slowlog", "smembers", "smismember", "smove", "sort", "spop", "srandmember",
    "srem", "sscan", "stralgo", "strlen", "subscribe", "substr", "sunion", "sunionstore",
    "swapdb", "sync", "time", "touch", "ttl", "type", "unlink", "unsubscribe", "unwatch",
    "wait", "watch", "xack", "xackdel", "xadd", "xautoclaim", "xclaim", "xdel", "xgroup",
    "xinfo", "xlen", "xpending", "xrange", "xread", "xreadgroup", "xrevrange", "xsetid",
    "xtrim", "zadd", "zcard", "zcount", "zdiff", "zdiffstore", "zincrby", "zinter",
    "zinterstore", "zlexcount", "zmscore", "zpopmax", "zpopmin", "zrandmember", "zrange",
    "zrangebylex", "zrangebyscore", "zrangestore", "zrank", "zrem", "zremrangebylex",
    "zremrangebyrank", "zremrangebyscore", "zrevrange", "zrevrangebylex", "zrevrangebyscore",
    "zrevrank", "zscan", "zscore", "zunion", "zunionstore",
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    #[test]
    fn default_dictionary_is_valid() {
        let dictionary = Dictionary::default();
        dictionary.validate().expect("built-in pools are non-empty");
        assert!(dictionary.tokens.iter().any(|t| t.len() == 256));
        assert!(dictionary.commands.iter().any(|c| c == "xackdel"));
    }

    #[test]
    fn json_dictionary_round_trips_through_validation() {
        let json = r#"{
            "version": 1,
            "commands": ["get"], "options": ["NX"], "tokens": ["0"],
            "keys": ["k"], "fields": ["f"], "values": ["v"], "groups": ["g"],
            "consumers": ["c"], "patterns": ["*"], "channels": ["ch"]
        }"#;
        let dictionary = Dictionary::from_json_str(json).expect("valid dictionary");
        assert_eq!(dictionary.keys, vec!["k".to_string()]);
    }

    #[test]
    fn json_dictionary_rejects_empty_pools_and_wrong_versions() {
        let empty_keys = r#"{
            "version": 1,
            "commands": ["get"], "options": ["NX"], "tokens": ["0"],
            "keys": [], "fields": ["f"], "values": ["v"], "groups": ["g"],
            "consumers": ["c"], "patterns": ["*"], "channels": ["ch"]
        }"#;
        assert!(matches!(
            Dictionary::from_json_str(empty_keys),
            Err(DictionaryError::EmptyPool("keys"))
        ));

        let wrong_version = empty_keys.replace("\"version\": 1", "\"version\": 7");
        assert!(matches!(
            Dictionary::from_json_str(&wrong_version),
            Err(DictionaryError::UnsupportedVersion { found: 7, .. })
        ));

        assert!(matches!(
            Dictionary::from_json_str("{ not json"),
            Err(DictionaryError::Parse(_))
        ));
    }

    #[test]
    fn pick_across_covers_every_pool() {
        let a = vec!["a".to_string()];
        let b = vec!["b".to_string(), "c".to_string()];
        let mut rng = ChaCha8Rng::from_seed([9u8; 32]);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(pick_across(&mut rng, &[&a, &b]).to_string());
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(pick_across(&mut rng, &[]), "");
    }

    #[test]
    fn pick_from_empty_pool_is_empty_string() {
        let mut rng = ChaCha8Rng::from_seed([1u8; 32]);
        let empty: [&str; 0] = [];
        assert_eq!(pick(&mut rng, &empty), "");
    }
}
