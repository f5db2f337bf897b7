//! Built-in radical table. Guarantees the app is useful without any config.

use crate::domain::Radical;

fn radical(character: &str, variant: Option<&str>, reading: &str, meaning: &str, difficulty: u8, examples: &[&str]) -> Radical {
  Radical {
    character: character.into(),
    variant: variant.map(Into::into),
    reading: reading.into(),
    meaning: meaning.into(),
    difficulty,
    examples: examples.iter().map(|s| s.to_string()).collect(),
  }
}

/// Default catalog, ordered roughly by how early a learner meets each radical.
pub fn seed_radicals() -> Vec<Radical> {
  vec![
    radical("人", Some("亻"), "rén", "person", 1, &["你", "他", "休"]),
    radical("口", None, "kǒu", "mouth/opening", 1, &["吃", "喝", "叫"]),
    radical("女", None, "nǚ", "woman/female", 1, &["好", "妈", "姐"]),
    radical("子", None, "zǐ", "child/son", 1, &["字", "学", "孩"]),
    radical("日", None, "rì", "sun/day", 1, &["明", "早", "时"]),
    radical("月", None, "yuè", "moon/month", 1, &["有", "朋", "服"]),
    radical("木", None, "mù", "tree/wood", 1, &["林", "本", "树"]),
    radical("水", Some("氵"), "shuǐ", "water", 1, &["河", "海", "洗"]),
    radical("火", Some("灬"), "huǒ", "fire", 1, &["灯", "热", "烧"]),
    radical("土", None, "tǔ", "earth/soil", 1, &["地", "在", "坐"]),
    radical("山", None, "shān", "mountain", 1, &["岛", "岁", "峰"]),
    radical("心", Some("忄"), "xīn", "heart/mind", 1, &["想", "忙", "快"]),
    radical("手", Some("扌"), "shǒu", "hand", 1, &["打", "找", "拿"]),
    radical("目", None, "mù", "eye", 2, &["看", "睡", "眼"]),
    radical("田", None, "tián", "field", 2, &["男", "思", "界"]),
    radical("力", None, "lì", "power/strength", 2, &["男", "加", "动"]),
    radical("刀", Some("刂"), "dāo", "knife", 2, &["分", "别", "到"]),
    radical("宀", None, "mián", "roof", 2, &["家", "安", "字"]),
    radical("囗", None, "wéi", "enclosure", 2, &["国", "回", "园"]),
    radical("门", None, "mén", "gate/door", 2, &["问", "间", "闪"]),
    radical("马", None, "mǎ", "horse", 2, &["妈", "吗", "骑"]),
    radical("车", None, "chē", "vehicle/cart", 2, &["轮", "转", "辆"]),
    radical("雨", None, "yǔ", "rain", 2, &["雪", "雷", "零"]),
    radical("言", Some("讠"), "yán", "speech/words", 2, &["说", "话", "语"]),
    radical("食", Some("饣"), "shí", "food/eat", 2, &["饭", "饿", "馆"]),
    radical("金", Some("钅"), "jīn", "metal/gold", 3, &["钱", "铁", "银"]),
    radical("糸", Some("纟"), "mì", "silk/thread", 3, &["红", "给", "经"]),
    radical("足", Some("⻊"), "zú", "foot", 3, &["跑", "路", "跳"]),
    radical("竹", Some("⺮"), "zhú", "bamboo", 3, &["笔", "笑", "等"]),
    radical("禾", None, "hé", "grain", 3, &["秋", "种", "和"]),
    radical("米", None, "mǐ", "rice", 3, &["粉", "精", "料"]),
    radical("石", None, "shí", "stone", 3, &["砖", "破", "研"]),
    radical("犬", Some("犭"), "quǎn", "dog", 3, &["狗", "猫", "狼"]),
    radical("衣", Some("衤"), "yī", "clothing", 3, &["衬", "被", "裤"]),
    radical("鸟", None, "niǎo", "bird", 3, &["鸡", "鸭", "鸣"]),
  ]
}
