//! 作物与城市目录（供配置阶段选择；作物名本身不做校验）

/// 作物季节
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Season {
    Summer,
    Winter,
}

/// 一个作物分组：季节、分组名、作物名
#[derive(Clone, Copy, Debug)]
pub struct CropGroup {
    pub season: Season,
    pub group: &'static str,
    pub crops: &'static [&'static str],
}

pub const CROP_GROUPS: &[CropGroup] = &[
    CropGroup {
        season: Season::Summer,
        group: "حبوب",
        crops: &["الذرة الشامية", "الذرة الرفيعة", "الأرز"],
    },
    CropGroup {
        season: Season::Summer,
        group: "خضر",
        crops: &[
            "الطماطم الصيفية",
            "الباذنجان",
            "الفلفل",
            "الخيار",
            "الكوسة",
            "البامية",
            "البطاطا",
            "القرع",
        ],
    },
    CropGroup {
        season: Season::Summer,
        group: "فواكه",
        crops: &["العنب", "المانجو", "البطيخ", "الشمام", "التين", "الجوافة"],
    },
    CropGroup {
        season: Season::Summer,
        group: "محاصيل نقدية وصناعية",
        crops: &["القطن", "قصب السكر", "عباد الشمس"],
    },
    CropGroup {
        season: Season::Winter,
        group: "حبوب",
        crops: &["القمح", "الشعير", "الفول البلدي", "العدس"],
    },
    CropGroup {
        season: Season::Winter,
        group: "خضر",
        crops: &[
            "البطاطس الشتوية",
            "البصل",
            "الثوم",
            "السبانخ",
            "الكرنب",
            "القرنبيط",
            "الجزر",
            "الخس",
            "الفاصوليا الشتوية",
            "البازلاء",
        ],
    },
    CropGroup {
        season: Season::Winter,
        group: "فواكه",
        crops: &["الموالح (البرتقال)", "الفراولة"],
    },
    CropGroup {
        season: Season::Winter,
        group: "محاصيل زيتية أو علفية",
        crops: &["الكتان", "البرسيم الحجازي", "البرسيم البلدي"],
    },
];

/// 某季节的全部作物
pub fn crops_in(season: Season) -> impl Iterator<Item = &'static str> {
    CROP_GROUPS
        .iter()
        .filter(move |g| g.season == season)
        .flat_map(|g| g.crops.iter().copied())
}

pub fn is_known_crop(name: &str) -> bool {
    CROP_GROUPS
        .iter()
        .any(|g| g.crops.iter().any(|c| *c == name.trim()))
}

/// 真实天气可选城市
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct City {
    pub name_ar: &'static str,
    pub name_en: &'static str,
}

pub const CITIES: &[City] = &[
    City { name_ar: "القاهرة", name_en: "Cairo" },
    City { name_ar: "الإسكندرية", name_en: "Alexandria" },
    City { name_ar: "الجيزة", name_en: "Giza" },
    City { name_ar: "الأقصر", name_en: "Luxor" },
    City { name_ar: "أسوان", name_en: "Aswan" },
    City { name_ar: "بورسعيد", name_en: "Port Said" },
    City { name_ar: "السويس", name_en: "Suez" },
    City { name_ar: "الإسماعيلية", name_en: "Ismailia" },
    City { name_ar: "دمياط", name_en: "Damietta" },
    City { name_ar: "المنصورة", name_en: "Mansoura" },
    City { name_ar: "طنطا", name_en: "Tanta" },
    City { name_ar: "الزقازيق", name_en: "Zagazig" },
    City { name_ar: "شرم الشيخ", name_en: "Sharm El Sheikh" },
    City { name_ar: "الغردقة", name_en: "Hurghada" },
    City { name_ar: "أسيوط", name_en: "Asyut" },
    City { name_ar: "المنيا", name_en: "Minya" },
    City { name_ar: "سوهاج", name_en: "Sohag" },
];

/// 按英文名（忽略大小写）或阿拉伯文名查找城市
pub fn find_city(query: &str) -> Option<&'static City> {
    let q = query.trim();
    CITIES
        .iter()
        .find(|c| c.name_en.eq_ignore_ascii_case(q) || c.name_ar == q)
}
