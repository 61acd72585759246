use super::Part::{Arg, Choice, Either, Opt};
use super::Shape::{CountedList, Fixed, NumberedKeys, VariadicTail, WeightedAggregate};
use super::Slot::{
    Below, Between, Channel, Consumer, Field, Float, FuzzyStreamId, Group, Int, Key, Lit, Mutated,
    OneOf, OneOfOrId, Pattern, Value,
};
use super::{GeneratorSpec, Part, Slot, Tail, spec};

const TTL: Slot = Below(100_000);
const TIMESTAMP: Slot = Between(-10, 2_147_483_648);
const LEX_LOW: Slot = OneOf(&["-", "[a", "(a", "[z", "+"]);
const LEX_HIGH: Slot = OneOf(&["+", "[z", "(z", "[a", "-"]);
const STREAM_START: Slot = OneOfOrId(&["-", "0-0"]);
const STREAM_END: Slot = OneOfOrId(&["+", "$"]);
const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

const COUNT: Part = Opt(0.6, &[Lit("COUNT"), TTL]);
const MATCH: Part = Opt(0.6, &[Lit("MATCH"), Pattern]);
const SCAN_TYPE: Part = Opt(
    0.2,
    &[
        Lit("TYPE"),
        OneOf(&["string", "hash", "list", "set", "zset", "stream"]),
    ],
);
const WITHSCORES: Part = Opt(0.4, &[Lit("WITHSCORES")]);
const SCORE_LIMIT: Part = Opt(0.5, &[Lit("LIMIT"), Int, Int]);

const fn tail(item: &'static [Slot], max: usize) -> Tail {
    Tail { item, max }
}

const fn keys_only(max: usize) -> super::Shape {
    VariadicTail {
        head: &[],
        tail: tail(&[Key], max),
        trailer: &[],
    }
}

const fn keyed(item: &'static [Slot], max: usize) -> super::Shape {
    VariadicTail {
        head: &[Arg(Key)],
        tail: tail(item, max),
        trailer: &[],
    }
}

/// Every operation with a dedicated generator. Anything else falls back to
/// the generic shapes.
pub static SPECS: &[GeneratorSpec] = &[
    // strings
    spec("PING", Fixed(&[Either(0.5, &[], &[Value])])),
    spec("ECHO", Fixed(&[Arg(Value)])),
    spec("GET", Fixed(&[Arg(Key)])),
    spec(
        "SET",
        Fixed(&[
            Arg(Key),
            Arg(Value),
            Opt(0.3, &[Lit("EX"), TTL]),
            Opt(0.2, &[Lit("PX"), TTL]),
            Opt(0.2, &[Lit("NX")]),
            Opt(0.2, &[Lit("XX")]),
        ]),
    ),
    spec("APPEND", Fixed(&[Arg(Key), Arg(Value)])),
    spec("INCR", Fixed(&[Arg(Key)])),
    spec("INCRBY", Fixed(&[Arg(Key), Arg(Int)])),
    spec("INCRBYFLOAT", Fixed(&[Arg(Key), Arg(Float)])),
    spec("DECR", Fixed(&[Arg(Key)])),
    spec("DECRBY", Fixed(&[Arg(Key), Arg(Int)])),
    spec("STRLEN", Fixed(&[Arg(Key)])),
    spec("GETRANGE", Fixed(&[Arg(Key), Arg(Int), Arg(Int)])),
    spec("SETRANGE", Fixed(&[Arg(Key), Arg(Int), Arg(Value)])),
    spec("GETSET", Fixed(&[Arg(Key), Arg(Value)])),
    spec("GETDEL", Fixed(&[Arg(Key)])),
    spec(
        "GETEX",
        Fixed(&[
            Arg(Key),
            Choice(&[&[Lit("EX"), TTL], &[Lit("PX"), TTL], &[Lit("PERSIST")], &[]]),
        ]),
    ),
    spec("SETEX", Fixed(&[Arg(Key), Arg(TTL), Arg(Value)])),
    spec("PSETEX", Fixed(&[Arg(Key), Arg(TTL), Arg(Value)])),
    spec("SETNX", Fixed(&[Arg(Key), Arg(Value)])),
    spec("GETBIT", Fixed(&[Arg(Key), Arg(Int)])),
    spec("SETBIT", Fixed(&[Arg(Key), Arg(Int), Arg(OneOf(&["0", "1", "2", ""]))])),
    spec("BITCOUNT", Fixed(&[Arg(Key), Opt(0.5, &[Int, Int])])),
    // keyspace
    spec("DEL", keys_only(128)),
    spec("UNLINK", keys_only(128)),
    spec("EXISTS", keys_only(128)),
    spec("TYPE", Fixed(&[Arg(Key)])),
    spec("TTL", Fixed(&[Arg(Key)])),
    spec("PTTL", Fixed(&[Arg(Key)])),
    spec("EXPIRE", Fixed(&[Arg(Key), Arg(Between(-10, 100_000))])),
    spec("PEXPIRE", Fixed(&[Arg(Key), Arg(Between(-10, 100_000))])),
    spec("EXPIREAT", Fixed(&[Arg(Key), Arg(TIMESTAMP)])),
    spec("PEXPIREAT", Fixed(&[Arg(Key), Arg(TIMESTAMP)])),
    spec("PERSIST", Fixed(&[Arg(Key)])),
    spec("RENAME", Fixed(&[Arg(Key), Arg(Key)])),
    spec("RENAMENX", Fixed(&[Arg(Key), Arg(Key)])),
    spec("MOVE", Fixed(&[Arg(Key), Arg(Between(-10, 100))])),
    spec("SELECT", Fixed(&[Arg(Between(-10, 256))])),
    spec("KEYS", Fixed(&[Arg(Pattern)])),
    spec("DBSIZE", Fixed(&[])),
    spec("RANDOMKEY", Fixed(&[])),
    spec("COPY", Fixed(&[Arg(Key), Arg(Key), Opt(0.3, &[Lit("REPLACE")])])),
    // hashes
    spec("HSET", keyed(&[Field, Value], 64)),
    spec("HSETNX", Fixed(&[Arg(Key), Arg(Field), Arg(Value)])),
    spec("HGET", Fixed(&[Arg(Key), Arg(Field)])),
    spec("HGETALL", Fixed(&[Arg(Key)])),
    spec("HDEL", keyed(&[Field], 128)),
    spec("HEXISTS", Fixed(&[Arg(Key), Arg(Field)])),
    spec("HLEN", Fixed(&[Arg(Key)])),
    spec("HSTRLEN", Fixed(&[Arg(Key), Arg(Field)])),
    spec("HINCRBY", Fixed(&[Arg(Key), Arg(Field), Arg(Int)])),
    spec("HINCRBYFLOAT", Fixed(&[Arg(Key), Arg(Field), Arg(Float)])),
    spec("HKEYS", Fixed(&[Arg(Key)])),
    spec("HVALS", Fixed(&[Arg(Key)])),
    spec("HMGET", keyed(&[Field], 128)),
    spec("HMSET", keyed(&[Field, Value], 64)),
    spec(
        "HRANDFIELD",
        Fixed(&[Arg(Key), Opt(0.7, &[Int]), Opt(0.4, &[Lit("WITHVALUES")])]),
    ),
    spec("HSCAN", Fixed(&[Arg(Key), Arg(Int), MATCH, COUNT, SCAN_TYPE])),
    // lists
    spec("LPUSH", keyed(&[Value], 256)),
    spec("RPUSH", keyed(&[Value], 256)),
    spec("LPUSHX", keyed(&[Value], 256)),
    spec("RPUSHX", keyed(&[Value], 256)),
    spec("LPOP", Fixed(&[Arg(Key), Opt(0.5, &[TTL])])),
    spec("RPOP", Fixed(&[Arg(Key), Opt(0.5, &[TTL])])),
    spec("LRANGE", Fixed(&[Arg(Key), Arg(Int), Arg(Int)])),
    spec("LLEN", Fixed(&[Arg(Key)])),
    spec(
        "LPOS",
        Fixed(&[
            Arg(Key),
            Arg(Value),
            Opt(0.4, &[Lit("RANK"), Int]),
            Opt(0.3, &[Lit("COUNT"), TTL]),
        ]),
    ),
    spec("LINDEX", Fixed(&[Arg(Key), Arg(Int)])),
    spec("LSET", Fixed(&[Arg(Key), Arg(Int), Arg(Value)])),
    spec("LREM", Fixed(&[Arg(Key), Arg(Int), Arg(Value)])),
    spec("LTRIM", Fixed(&[Arg(Key), Arg(Int), Arg(Int)])),
    spec(
        "LINSERT",
        Fixed(&[
            Arg(Key),
            Arg(OneOf(&["BEFORE", "AFTER", "X", ""])),
            Arg(Value),
            Arg(Value),
        ]),
    ),
    spec("RPOPLPUSH", Fixed(&[Arg(Key), Arg(Key)])),
    spec(
        "LMOVE",
        Fixed(&[
            Arg(Key),
            Arg(Key),
            Arg(OneOf(&["LEFT", "RIGHT", "X", ""])),
            Arg(OneOf(&["LEFT", "RIGHT", "Y", ""])),
        ]),
    ),
    // sets
    spec("SADD", keyed(&[Value], 512)),
    spec("SREM", keyed(&[Value], 512)),
    spec("SCARD", Fixed(&[Arg(Key)])),
    spec("SMEMBERS", Fixed(&[Arg(Key)])),
    spec("SISMEMBER", Fixed(&[Arg(Key), Arg(Value)])),
    spec("SMISMEMBER", keyed(&[Value], 512)),
    spec("SPOP", Fixed(&[Arg(Key), Opt(0.6, &[TTL])])),
    spec("SRANDMEMBER", Fixed(&[Arg(Key), Opt(0.6, &[Int])])),
    spec("SMOVE", Fixed(&[Arg(Key), Arg(Key), Arg(Value)])),
    spec("SDIFF", keys_only(64)),
    spec("SDIFFSTORE", keyed(&[Key], 64)),
    spec("SINTER", keys_only(64)),
    spec("SINTERSTORE", keyed(&[Key], 64)),
    spec("SUNION", keys_only(64)),
    spec("SUNIONSTORE", keyed(&[Key], 64)),
    spec("SSCAN", Fixed(&[Arg(Key), Arg(Int), MATCH, COUNT, SCAN_TYPE])),
    // sorted sets
    spec(
        "ZADD",
        VariadicTail {
            head: &[
                Arg(Key),
                Opt(0.2, &[Lit("NX")]),
                Opt(0.2, &[Lit("XX")]),
                Opt(0.2, &[Lit("CH")]),
                Opt(0.2, &[Lit("INCR")]),
            ],
            tail: tail(&[Float, Value], 256),
            trailer: &[],
        },
    ),
    spec("ZREM", keyed(&[Value], 512)),
    spec("ZCARD", Fixed(&[Arg(Key)])),
    spec("ZCOUNT", Fixed(&[Arg(Key), Arg(Float), Arg(Float)])),
    spec("ZSCORE", Fixed(&[Arg(Key), Arg(Value)])),
    spec("ZRANK", Fixed(&[Arg(Key), Arg(Value)])),
    spec("ZREVRANK", Fixed(&[Arg(Key), Arg(Value)])),
    spec("ZRANGE", Fixed(&[Arg(Key), Arg(Int), Arg(Int), WITHSCORES])),
    spec("ZREVRANGE", Fixed(&[Arg(Key), Arg(Int), Arg(Int), WITHSCORES])),
    spec(
        "ZRANGEBYSCORE",
        Fixed(&[Arg(Key), Arg(Float), Arg(Float), SCORE_LIMIT, WITHSCORES]),
    ),
    spec(
        "ZREVRANGEBYSCORE",
        Fixed(&[Arg(Key), Arg(Float), Arg(Float), SCORE_LIMIT, WITHSCORES]),
    ),
    spec("ZLEXCOUNT", Fixed(&[Arg(Key), Arg(LEX_LOW), Arg(LEX_HIGH)])),
    spec("ZRANGEBYLEX", Fixed(&[Arg(Key), Arg(LEX_LOW), Arg(LEX_HIGH)])),
    spec("ZREVRANGEBYLEX", Fixed(&[Arg(Key), Arg(LEX_HIGH), Arg(LEX_LOW)])),
    spec("ZSCAN", Fixed(&[Arg(Key), Arg(Int), MATCH, COUNT, SCAN_TYPE])),
    spec("ZPOPMAX", Fixed(&[Arg(Key), Opt(0.6, &[TTL])])),
    spec("ZPOPMIN", Fixed(&[Arg(Key), Opt(0.6, &[TTL])])),
    spec("ZRANDMEMBER", Fixed(&[Arg(Key), Opt(0.7, &[Int]), WITHSCORES])),
    spec("ZINCRBY", Fixed(&[Arg(Key), Arg(Float), Arg(Value)])),
    spec("ZREMRANGEBYRANK", Fixed(&[Arg(Key), Arg(Int), Arg(Int)])),
    spec("ZREMRANGEBYSCORE", Fixed(&[Arg(Key), Arg(Float), Arg(Float)])),
    spec("ZREMRANGEBYLEX", Fixed(&[Arg(Key), Arg(LEX_LOW), Arg(LEX_HIGH)])),
    spec("ZMSCORE", keyed(&[Value], 512)),
    spec("ZINTER", WeightedAggregate { destination: false }),
    spec("ZUNION", WeightedAggregate { destination: false }),
    spec("ZINTERSTORE", WeightedAggregate { destination: true }),
    spec("ZUNIONSTORE", WeightedAggregate { destination: true }),
    // streams
    spec(
        "XADD",
        VariadicTail {
            head: &[Arg(Key), Arg(OneOfOrId(&["*", "0-0"]))],
            tail: tail(&[Field, Value], 64),
            trailer: &[],
        },
    ),
    spec(
        "XDEL",
        CountedList {
            head: &[Key],
            marker: None,
            element: FuzzyStreamId,
        },
    ),
    spec("XLEN", Fixed(&[Arg(Key)])),
    spec(
        "XRANGE",
        Fixed(&[
            Arg(Key),
            Arg(STREAM_START),
            Arg(STREAM_END),
            Opt(0.5, &[Lit("COUNT"), TTL]),
        ]),
    ),
    spec(
        "XREVRANGE",
        Fixed(&[
            Arg(Key),
            Arg(STREAM_END),
            Arg(STREAM_START),
            Opt(0.5, &[Lit("COUNT"), TTL]),
        ]),
    ),
    spec(
        "XGROUP",
        Fixed(&[Choice(&[
            &[
                Lit("CREATE"),
                Key,
                Group,
                OneOf(&["0-0", "$"]),
                OneOf(&["MKSTREAM", "ENTRIESREAD", "0", "1", "2", "500"]),
            ],
            &[Lit("SETID"), Key, Group, OneOfOrId(&["0-0", "$", "1-0"])],
            &[Lit("CREATECONSUMER"), Key, Group, Consumer],
            &[Lit("DELCONSUMER"), Key, Group, Consumer],
            &[Lit("DESTROY"), Key, Group],
        ])]),
    ),
    spec(
        "XREADGROUP",
        Fixed(&[
            Arg(Lit("GROUP")),
            Arg(Group),
            Arg(Consumer),
            Opt(0.7, &[Lit("COUNT"), TTL]),
            Opt(0.5, &[Lit("BLOCK"), TTL]),
            Arg(Lit("STREAMS")),
            Arg(Key),
            Arg(OneOfOrId(&[">", "0-0"])),
        ]),
    ),
    spec(
        "XREAD",
        Fixed(&[
            Opt(0.7, &[Lit("COUNT"), TTL]),
            Opt(0.5, &[Lit("BLOCK"), TTL]),
            Arg(Lit("STREAMS")),
            Arg(Key),
            Arg(OneOfOrId(&["$", "0-0"])),
        ]),
    ),
    spec(
        "XPENDING",
        Fixed(&[
            Arg(Key),
            Arg(Group),
            Opt(0.5, &[OneOf(&["-", "+"]), OneOf(&["-", "+"]), TTL]),
        ]),
    ),
    spec(
        "XINFO",
        Fixed(&[
            Arg(OneOf(&["STREAM", "GROUPS", "CONSUMERS"])),
            Arg(Key),
            Opt(0.3, &[Group, Consumer]),
        ]),
    ),
    spec(
        "XACK",
        CountedList {
            head: &[Key, Group],
            marker: None,
            element: FuzzyStreamId,
        },
    ),
    spec(
        "XCLAIM",
        VariadicTail {
            head: &[Arg(Key), Arg(Group), Arg(Consumer), Arg(TTL)],
            tail: tail(&[FuzzyStreamId], 128),
            trailer: &[Opt(0.3, &[Lit("JUSTID")])],
        },
    ),
    spec(
        "XAUTOCLAIM",
        Fixed(&[
            Arg(Key),
            Arg(Group),
            Arg(Consumer),
            Arg(TTL),
            Arg(OneOfOrId(&["0-0", "$"])),
            Opt(0.7, &[Lit("COUNT"), TTL]),
        ]),
    ),
    spec(
        "XSETID",
        Fixed(&[
            Arg(Key),
            Arg(OneOfOrId(&["0-0", "$"])),
            Opt(0.4, &[Lit("ENTRIESADDED"), Int]),
        ]),
    ),
    spec(
        "XTRIM",
        Fixed(&[
            Arg(Key),
            Arg(OneOf(&["MAXLEN", "MINID"])),
            Arg(OneOf(&["~", "=", ""])),
            Arg(TTL),
            Opt(0.5, &[Lit("LIMIT"), TTL]),
        ]),
    ),
    spec(
        "XACKDEL",
        CountedList {
            head: &[Key, Group],
            marker: Some("IDS"),
            element: FuzzyStreamId,
        },
    ),
    // pub/sub
    spec("PUBLISH", Fixed(&[Arg(Channel), Arg(Value)])),
    spec(
        "SUBSCRIBE",
        VariadicTail {
            head: &[],
            tail: tail(&[Channel], 64),
            trailer: &[],
        },
    ),
    spec(
        "UNSUBSCRIBE",
        VariadicTail {
            head: &[],
            tail: tail(&[Channel], 64),
            trailer: &[],
        },
    ),
    spec(
        "PSUBSCRIBE",
        VariadicTail {
            head: &[],
            tail: tail(&[Pattern], 64),
            trailer: &[],
        },
    ),
    spec(
        "PUNSUBSCRIBE",
        VariadicTail {
            head: &[],
            tail: tail(&[Pattern], 64),
            trailer: &[],
        },
    ),
    spec(
        "PUBSUB",
        Fixed(&[Either(
            0.7,
            &[OneOf(&["CHANNELS", "NUMSUB", "NUMPAT"]), Pattern],
            &[OneOf(&["HELP", "SHARDCHANNELS", "SHARDNUMSUB"])],
        )]),
    ),
    // scripting
    spec(
        "EVAL",
        NumberedKeys {
            scripts: &[
                "return 1",
                "return redis.call('PING')",
                "redis.call('SET','k','v'); return redis.call('GET','k')",
                "redis.call('XADD','mystream','*','f','v'); return 0",
            ],
            max_keys: 2,
            args: tail(&[Value], 10),
            args_probability: 0.6,
        },
    ),
    spec(
        "EVALSHA",
        Fixed(&[
            Arg(Mutated(ZERO_SHA)),
            Arg(OneOf(&["0", "1", "2"])),
            Opt(0.5, &[Key]),
            Opt(0.5, &[Value]),
        ]),
    ),
    spec(
        "SCRIPT",
        Fixed(&[Either(
            0.6,
            &[OneOf(&["LOAD", "EXISTS", "FLUSH", "KILL", "HELP"]), Value],
            &[Lit("HELP")],
        )]),
    ),
    spec("SCAN", Fixed(&[Arg(Int), MATCH, COUNT, SCAN_TYPE])),
    // transactions
    spec("MULTI", Fixed(&[])),
    spec("EXEC", Fixed(&[])),
    spec("DISCARD", Fixed(&[])),
    spec("WATCH", keys_only(64)),
    spec("UNWATCH", Fixed(&[])),
    // bulk
    spec("MGET", keys_only(256)),
    spec(
        "MSET",
        VariadicTail {
            head: &[],
            tail: tail(&[Key, Value], 128),
            trailer: &[],
        },
    ),
    spec(
        "MSETNX",
        VariadicTail {
            head: &[],
            tail: tail(&[Key, Value], 128),
            trailer: &[],
        },
    ),
    spec("HOST:", Fixed(&[Opt(0.5, &[Value])])),
];
