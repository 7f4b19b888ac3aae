//! Prompt templates for script generation and viral rewrites.

use shopreel_models::{ConversionGoal, ScriptType, ShopProfile};

/// System prompt for one-shot JSON storyboards.
pub const SCRIPT_SYSTEM_PROMPT: &str = "你是一个短视频流量专家。你的客户是实体店老板。
你的任务是根据用户的[店铺档案]和[转化目标]，生成分镜脚本。
风格要求：拒绝废话，多用短句，开头必须由钩子(Hook)。
输出格式：必须是严格的 JSON 格式，包含 title, cover_text, script_list [{ visual, audio, emotion }]";

/// System prompt for viral rewrites.
pub const REWRITE_SYSTEM_PROMPT: &str =
    "你是一个短视频流量专家和内容创作高手。你的任务是帮助实体店老板快速创作爆款内容。";

/// System prompt for the hook-suggestion step.
pub const IDEAS_SYSTEM_PROMPT: &str = "你是一个短视频流量专家，擅长为实体店设计开头钩子。
根据用户给出的[行业]和[所在城市]，先用一两句话回应用户，再给出三组不同方向的钩子弹药箱。
输出格式：必须是严格的 JSON 格式，包含 reply 和 ammo_boxes [{ type, hooks: [string] }]，每组 3 条钩子。";

/// System prompt for the Markdown script step.
pub const HOOK_SCRIPT_SYSTEM_PROMPT: &str = "你是一个短视频编导，为实体店老板写可以直接开拍的口播脚本。
风格要求：拒绝废话，多用短句，口语化，每个镜头都要有画面和台词。
输出格式：Markdown，包含标题、分镜表（镜头/画面/台词/情绪）和拍摄建议。";

const SCRIPT_JSON_SHAPE: &str = r#"{
  "title": "脚本标题",
  "cover_text": "封面文案",
  "script_list": [
    {
      "visual": "画面描述",
      "audio": "台词内容",
      "emotion": "情绪表达"
    }
  ]
}"#;

pub fn conversion_goal_instruction(goal: ConversionGoal) -> &'static str {
    match goal {
        ConversionGoal::Followers => "结尾增加互动提问或槽点，引导用户评论关注。",
        ConversionGoal::Sales => "结尾增加限时优惠和紧迫感，促进购买转化。",
        ConversionGoal::Trust => "结尾增加售后承诺，建立用户信任。",
    }
}

pub fn script_type_instruction(script_type: ScriptType) -> &'static str {
    match script_type {
        ScriptType::PersonaStory => "生成个人品牌故事，突出老板的人格魅力和专业背景。",
        ScriptType::VisitReason => "生成吸引顾客到店的理由，强调独特价值和体验。",
        ScriptType::Opinion => "生成行业观点或见解，展示专业度和权威性。",
        ScriptType::Voiceover => "生成直接的口播文案，简洁有力地传达核心信息。",
        ScriptType::TrendingTopic => "生成热门话题相关的选题，具备传播潜力。",
        ScriptType::TrendingRemix => "仿写热门内容的结构和风格，保持核心要素。",
        ScriptType::Inspiration => "",
    }
}

fn shop_block(shop: &ShopProfile) -> String {
    format!(
        "店铺档案:
- 店铺名称: {}
- 店铺类别: {}
- 目标客户: {}
- 独特卖点: {}
- 老板人设: {}",
        shop.shop_name,
        shop.category,
        shop.target_audience,
        shop.unique_selling_point,
        shop.boss_persona
    )
}

/// User prompt for a one-shot JSON storyboard.
pub fn direct_script_prompt(
    shop: &ShopProfile,
    script_type: ScriptType,
    goal: ConversionGoal,
    topic: &str,
) -> String {
    format!(
        "{shop}

创作要求:
- 脚本类型: {script_type}
- 转化目标: {goal}
- 主题关键词: {topic}

具体指令:
{type_instruction}
{goal_instruction}

请严格按照以下 JSON 格式返回结果，不要添加任何其他内容：
{SCRIPT_JSON_SHAPE}",
        shop = shop_block(shop),
        script_type = script_type.label(),
        goal = goal.label(),
        type_instruction = script_type_instruction(script_type),
        goal_instruction = conversion_goal_instruction(goal),
    )
}

/// User prompt for rewriting a transcribed viral video for a shop.
pub fn rewrite_prompt(transcript: &str, shop: &ShopProfile) -> String {
    format!(
        "你是一个短视频爆款内容专家。用户提供了一个热门视频的转录文本，需要你根据这个内容的结构、逻辑和表现手法进行仿写，创建一个适合{name}({category})的版本。

原始视频转录文本:
{transcript}

{shop}

任务要求:
1. 分析原始文本的钩子、冲突、转折、CTA 等关键要素
2. 保留这些元素的结构，但用店铺相关的内容进行替换
3. 确保文案符合短视频传播规律，有吸引力和转化力
4. 输出格式为 Markdown，包含:
   - 📝 分析: 原始视频的关键要素
   - 🎯 仿写脚本: 改编后的内容

请开始仿写:",
        name = shop.shop_name,
        category = shop.category,
        shop = shop_block(shop),
    )
}

pub fn ideas_prompt(industry: &str, location: &str) -> String {
    format!("行业: {industry}\n所在城市: {location}\n\n请给出适合这家店的开头钩子。")
}

pub fn hook_script_prompt(industry: &str, location: &str, hook: &str) -> String {
    format!(
        "行业: {industry}\n所在城市: {location}\n选定钩子: {hook}\n\n请以这个钩子开头，写一条 30 到 60 秒的短视频脚本。"
    )
}
