use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::DatabaseProxy;

struct SeedWord {
    spelling: &'static str,
    phonetic: &'static str,
    meanings: &'static [&'static str],
    collocations: &'static [&'static str],
    sentences: &'static [(&'static str, &'static str)],
}

const SEED_WORDS: &[SeedWord] = &[
    SeedWord {
        spelling: "especially",
        phonetic: "/ɪˈspeʃəli/",
        meanings: &["adv. 特别是，尤其"],
        collocations: &["especially for", "especially when", "especially important"],
        sentences: &[
            (
                "I love fruits, especially strawberries.",
                "我喜欢水果，尤其是草莓。",
            ),
            (
                "This is especially important for beginners.",
                "这对初学者来说尤为重要。",
            ),
        ],
    },
    SeedWord {
        spelling: "specific",
        phonetic: "/spəˈsɪfɪk/",
        meanings: &["adj. 特定的，具体的"],
        collocations: &["specific to", "specific details", "be specific about"],
        sentences: &[
            (
                "Can you be more specific about the problem?",
                "你能更具体地说明一下问题吗？",
            ),
            (
                "This rule is specific to our company.",
                "这条规则是我们公司特有的。",
            ),
        ],
    },
    SeedWord {
        spelling: "bargain",
        phonetic: "/ˈbɑːrɡən/",
        meanings: &["n. 便宜货，特价商品", "v. 讨价还价"],
        collocations: &["a real bargain", "bargain for", "bargain hunter"],
        sentences: &[
            (
                "This dress is a real bargain at half price!",
                "这条裙子半价，真是太划算了！",
            ),
            (
                "She loves bargain hunting at the mall.",
                "她喜欢在商场淘便宜货。",
            ),
        ],
    },
    SeedWord {
        spelling: "groceries",
        phonetic: "/ˈɡroʊsəriz/",
        meanings: &["n. 杂货，食品"],
        collocations: &["buy groceries", "grocery store", "grocery shopping"],
        sentences: &[
            (
                "I need to buy some groceries after work.",
                "下班后我需要买些杂货。",
            ),
            (
                "We do grocery shopping every weekend.",
                "我们每个周末都去买食品杂货。",
            ),
        ],
    },
    SeedWord {
        spelling: "recommend",
        phonetic: "/ˌrekəˈmend/",
        meanings: &["v. 推荐，建议"],
        collocations: &["highly recommend", "recommend doing", "recommend to"],
        sentences: &[
            (
                "I highly recommend this restaurant.",
                "我强烈推荐这家餐厅。",
            ),
            (
                "The doctor recommended getting more sleep.",
                "医生建议多睡觉。",
            ),
        ],
    },
    SeedWord {
        spelling: "convenient",
        phonetic: "/kənˈviːniənt/",
        meanings: &["adj. 方便的，便利的"],
        collocations: &["convenient for", "a convenient time", "convenient location"],
        sentences: &[
            (
                "Is this a convenient time to talk?",
                "现在谈话方便吗？",
            ),
            (
                "The hotel is convenient for the airport.",
                "这家酒店去机场很方便。",
            ),
        ],
    },
    SeedWord {
        spelling: "schedule",
        phonetic: "/ˈskedʒuːl/",
        meanings: &["n. 日程安排", "v. 安排，预定"],
        collocations: &["on schedule", "behind schedule", "a busy schedule"],
        sentences: &[
            (
                "The train arrived on schedule.",
                "火车准点到达。",
            ),
            (
                "She has a very busy schedule this week.",
                "她这周日程很满。",
            ),
        ],
    },
    SeedWord {
        spelling: "available",
        phonetic: "/əˈveɪləbl/",
        meanings: &["adj. 可用的，有空的"],
        collocations: &["available for", "readily available", "make available"],
        sentences: &[
            (
                "Is this seat available?",
                "这个座位有人吗？",
            ),
            (
                "The manager is available after three.",
                "经理三点以后有空。",
            ),
        ],
    },
];

/// Seed the starter word list when `SEED_INITIAL_WORDS` is set. Existing
/// spellings are left untouched, so running it repeatedly is harmless.
pub async fn seed_initial_words(proxy: &DatabaseProxy) {
    if !env_flag("SEED_INITIAL_WORDS") {
        return;
    }

    let pool = proxy.pool();
    let mut inserted = 0usize;

    for word in SEED_WORDS {
        match insert_seed_word(pool, word).await {
            Ok(true) => inserted += 1,
            Ok(false) => {
                tracing::debug!(spelling = word.spelling, "seed word already exists");
            }
            Err(err) => {
                tracing::warn!(error = %err, spelling = word.spelling, "failed to seed word");
            }
        }
    }

    if inserted > 0 {
        tracing::info!(count = inserted, "seeded starter words");
    }
}

async fn insert_seed_word(pool: &PgPool, word: &SeedWord) -> Result<bool, sqlx::Error> {
    let sentences: Vec<serde_json::Value> = word
        .sentences
        .iter()
        .map(|(en, cn)| serde_json::json!({ "en": en, "cn": cn }))
        .collect();

    let result = sqlx::query(
        r#"
        INSERT INTO "words"
          ("id","spelling","phonetic","meanings","collocations","sentences","isCustom","createdAt")
        VALUES ($1,$2,$3,$4,$5,$6,FALSE,$7)
        ON CONFLICT ("spelling") DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(word.spelling)
    .bind(word.phonetic)
    .bind(word.meanings.iter().map(|s| s.to_string()).collect::<Vec<String>>())
    .bind(
        word.collocations
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<String>>(),
    )
    .bind(serde_json::Value::Array(sentences))
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Backfill progress records for catalog words that have none yet, placing
/// them at the stage given by `SEED_PROGRESS_STAGE` and due immediately.
/// Used when importing a word list the user has already partly studied.
pub async fn backfill_progress(proxy: &DatabaseProxy, user_id: &str) {
    let Some(stage) = std::env::var("SEED_PROGRESS_STAGE")
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .filter(|value| (0..=8).contains(value))
    else {
        return;
    };

    let pool = proxy.pool();
    let word_ids: Vec<String> = match sqlx::query_scalar(
        r#"
        SELECT w."id" FROM "words" w
        WHERE NOT EXISTS (
          SELECT 1 FROM "user_progress" p
          WHERE p."wordId" = w."id" AND p."userId" = $1
        )
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!(error = %err, "progress backfill lookup failed");
            return;
        }
    };

    if word_ids.is_empty() {
        tracing::debug!("no words need progress backfill");
        return;
    }

    let now = Utc::now().naive_utc();
    let mut created = 0usize;

    for word_id in &word_ids {
        let result = sqlx::query(
            r#"
            INSERT INTO "user_progress"
              ("id","userId","wordId","stage","status","nextReviewTime","wrongCount","lastReviewedAt")
            VALUES ($1,$2,$3,$4,'LEARNING',$5,0,$6)
            ON CONFLICT ("userId","wordId") DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(word_id)
        .bind(stage)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => created += 1,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, word_id = %word_id, "progress backfill insert failed");
            }
        }
    }

    tracing::info!(count = created, stage, "backfilled progress records");
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}
