use std::borrow::Cow;
use std::collections::BTreeMap;

use gltf::binary::Glb;
use gltf_json::accessor::{ComponentType, GenericComponentType, Type as AccessorType};
use gltf_json::buffer::Target;
use gltf_json::mesh::{Mode, Primitive, Semantic};
use gltf_json::validation::{Checked, USize64};
use gltf_json::Index;
use serde_json::json;

use super::tile_content::{AssembledTile, ObjectArrays};
use crate::error::{CityAtlasError, Result};
use crate::transform::swap_z_up_to_y_up;
use crate::types::TextureData;

const GENERATOR: &str = "city-atlas";

const EXT_MESH_FEATURES: &str = "EXT_mesh_features";
const EXT_STRUCTURAL_METADATA: &str = "EXT_structural_metadata";
/// Serialized as `_FEATURE_ID_0`.
const FEATURE_ID_ATTRIBUTE: &str = "FEATURE_ID_0";

/// Serialize an assembled tile into a binary GLB (glTF 2.0) byte buffer.
///
/// Layout:
/// - 1 buffer holding every vertex attribute plus the optional atlas image
/// - 1 non-indexed Mesh (mode = Triangles) and 1 Node per object, both named
///   by the object id
/// - 1 Scene listing every node, omitted when no object has geometry
/// - 1 Material sampling `atlas`, shared by textured objects
///
/// Each drawn object is one feature: its primitive carries a constant
/// `_FEATURE_ID_0` attribute (`EXT_mesh_features`) equal to its position among
/// the nodes, and an `EXT_structural_metadata` property table maps that index
/// back to the object id.
///
/// Positions and normals are rotated from Z-up to glTF's Y-up.
pub fn write_tile_glb(tile: &AssembledTile, atlas: Option<&TextureData>) -> Result<Vec<u8>> {
    let mut root = gltf_json::Root {
        asset: gltf_json::Asset {
            version: "2.0".into(),
            generator: Some(GENERATOR.into()),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut bin_data: Vec<u8> = Vec::new();
    let buffer_idx = Index::new(0); // pushed last

    let material = atlas.map(|tex| push_atlas_material(&mut root, &mut bin_data, buffer_idx, tex));

    let drawn: Vec<&ObjectArrays> = tile.objects.iter().filter(|o| !o.positions.is_empty()).collect();
    let mut nodes = Vec::with_capacity(drawn.len());
    for (feature_id, object) in drawn.iter().enumerate() {
        let mesh_idx =
            push_object_mesh(&mut root, &mut bin_data, buffer_idx, object, feature_id, material);
        nodes.push(root.push(gltf_json::Node {
            mesh: Some(mesh_idx),
            name: Some(object.object_id.to_string()),
            ..Default::default()
        }));
    }

    // A scene without nodes does not read back.
    if !nodes.is_empty() {
        push_feature_table(&mut root, &mut bin_data, buffer_idx, &drawn)?;
        let scene_idx = root.push(gltf_json::Scene {
            nodes,
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        root.scene = Some(scene_idx);
    }

    pad_to_4(&mut bin_data);
    if !bin_data.is_empty() {
        root.push(gltf_json::Buffer {
            byte_length: USize64::from(bin_data.len()),
            uri: None,
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
    }

    assemble_glb(&root, bin_data)
}

fn push_object_mesh(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    object: &ObjectArrays,
    feature_id: usize,
    material: Option<Index<gltf_json::Material>>,
) -> Index<gltf_json::Mesh> {
    let vertex_count = object.positions.len() / 3;
    let mut attributes = BTreeMap::new();

    let mut positions = object.positions.clone();
    swap_z_up_to_y_up(&mut positions);
    let (pos_min, pos_max) = compute_position_bounds(&positions);
    let pos_accessor = push_f32_attribute(
        root,
        bin_data,
        buffer_idx,
        &positions,
        AccessorType::Vec3,
        vertex_count,
        Some((pos_min, pos_max)),
    );
    attributes.insert(Checked::Valid(Semantic::Positions), pos_accessor);

    if object.normals.len() == object.positions.len() {
        let mut normals = object.normals.clone();
        swap_z_up_to_y_up(&mut normals);
        let accessor = push_f32_attribute(
            root,
            bin_data,
            buffer_idx,
            &normals,
            AccessorType::Vec3,
            vertex_count,
            None,
        );
        attributes.insert(Checked::Valid(Semantic::Normals), accessor);
    }

    let textured = material.is_some() && object.uvs.len() / 2 == vertex_count;
    if textured {
        let accessor = push_f32_attribute(
            root,
            bin_data,
            buffer_idx,
            &object.uvs,
            AccessorType::Vec2,
            vertex_count,
            None,
        );
        attributes.insert(Checked::Valid(Semantic::TexCoords(0)), accessor);
    }

    let feature_ids = vec![feature_id as f32; vertex_count];
    let accessor = push_f32_attribute(
        root,
        bin_data,
        buffer_idx,
        &feature_ids,
        AccessorType::Scalar,
        vertex_count,
        None,
    );
    attributes.insert(
        Checked::Valid(Semantic::Extras(FEATURE_ID_ATTRIBUTE.into())),
        accessor,
    );

    let mut others = serde_json::Map::new();
    others.insert(
        EXT_MESH_FEATURES.into(),
        json!({
            "featureIds": [{ "featureCount": 1, "attribute": 0, "propertyTable": 0 }]
        }),
    );

    let primitive = Primitive {
        attributes,
        indices: None,
        material: if textured { material } else { None },
        mode: Checked::Valid(Mode::Triangles),
        targets: None,
        extensions: Some(gltf_json::extensions::mesh::Primitive {
            others,
            ..Default::default()
        }),
        extras: Default::default(),
    };

    root.push(gltf_json::Mesh {
        primitives: vec![primitive],
        weights: None,
        name: Some(object.object_id.to_string()),
        extensions: Default::default(),
        extras: Default::default(),
    })
}

/// Append a flat f32 attribute as its own buffer view and accessor.
fn push_f32_attribute(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    data: &[f32],
    type_: AccessorType,
    count: usize,
    bounds: Option<([f32; 3], [f32; 3])>,
) -> Index<gltf_json::Accessor> {
    pad_to_4(bin_data);
    let byte_offset = bin_data.len();
    let bytes: &[u8] = bytemuck::cast_slice(data);
    bin_data.extend_from_slice(bytes);

    let view = root.push(gltf_json::buffer::View {
        buffer: buffer_idx,
        byte_length: USize64::from(bytes.len()),
        byte_offset: Some(USize64::from(byte_offset)),
        byte_stride: None,
        name: None,
        target: Some(Checked::Valid(Target::ArrayBuffer)),
        extensions: Default::default(),
        extras: Default::default(),
    });

    root.push(gltf_json::Accessor {
        buffer_view: Some(view),
        byte_offset: Some(USize64(0)),
        count: USize64::from(count),
        component_type: Checked::Valid(GenericComponentType(ComponentType::F32)),
        type_: Checked::Valid(type_),
        min: bounds.map(|(min, _)| json!(min)),
        max: bounds.map(|(_, max)| json!(max)),
        name: None,
        normalized: false,
        sparse: None,
        extensions: Default::default(),
        extras: Default::default(),
    })
}

/// Append raw bytes as a target-less buffer view.
fn push_raw_view(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    bytes: &[u8],
) -> Index<gltf_json::buffer::View> {
    pad_to_4(bin_data);
    let byte_offset = bin_data.len();
    bin_data.extend_from_slice(bytes);

    root.push(gltf_json::buffer::View {
        buffer: buffer_idx,
        byte_length: USize64::from(bytes.len()),
        byte_offset: Some(USize64::from(byte_offset)),
        byte_stride: None,
        name: None,
        target: None,
        extensions: Default::default(),
        extras: Default::default(),
    })
}

/// Property table of object ids, one row per feature id.
///
/// Ids are stored as a UTF-8 blob plus `count + 1` UINT32 string offsets.
fn push_feature_table(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    objects: &[&ObjectArrays],
) -> Result<()> {
    let mut values = Vec::new();
    let mut offsets: Vec<u32> = Vec::with_capacity(objects.len() + 1);
    offsets.push(0);
    for object in objects {
        values.extend_from_slice(object.object_id.as_str().as_bytes());
        let end = u32::try_from(values.len())
            .map_err(|_| CityAtlasError::Output("Object id table exceeds 4 GiB".into()))?;
        offsets.push(end);
    }

    let values_view = push_raw_view(root, bin_data, buffer_idx, &values);
    let offsets_view = push_raw_view(root, bin_data, buffer_idx, bytemuck::cast_slice(&offsets));

    let mut others = serde_json::Map::new();
    others.insert(
        EXT_STRUCTURAL_METADATA.into(),
        json!({
            "schema": {
                "id": "city_atlas",
                "classes": {
                    "building": {
                        "properties": {
                            "id": { "type": "STRING", "required": true }
                        }
                    }
                }
            },
            "propertyTables": [{
                "class": "building",
                "count": objects.len(),
                "properties": {
                    "id": {
                        "values": values_view.value(),
                        "stringOffsets": offsets_view.value(),
                        "stringOffsetType": "UINT32"
                    }
                }
            }]
        }),
    );
    root.extensions = Some(gltf_json::extensions::root::Root {
        others,
        ..Default::default()
    });
    root.extensions_used.push(EXT_MESH_FEATURES.into());
    root.extensions_used.push(EXT_STRUCTURAL_METADATA.into());
    Ok(())
}

/// Embed the atlas image and build the material that samples it.
fn push_atlas_material(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    atlas: &TextureData,
) -> Index<gltf_json::Material> {
    let view = push_raw_view(root, bin_data, buffer_idx, &atlas.data);

    let image_idx = root.push(gltf_json::Image {
        buffer_view: Some(view),
        mime_type: Some(gltf_json::image::MimeType(atlas.mime_type.clone())),
        uri: None,
        name: Some("atlas".into()),
        extensions: Default::default(),
        extras: Default::default(),
    });

    // Neighbouring textures share edges, so no mipmaps and no wrapping.
    let sampler_idx = root.push(gltf_json::texture::Sampler {
        mag_filter: Some(Checked::Valid(gltf_json::texture::MagFilter::Linear)),
        min_filter: Some(Checked::Valid(gltf_json::texture::MinFilter::Linear)),
        wrap_s: Checked::Valid(gltf_json::texture::WrappingMode::ClampToEdge),
        wrap_t: Checked::Valid(gltf_json::texture::WrappingMode::ClampToEdge),
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });

    let texture_idx = root.push(gltf_json::Texture {
        sampler: Some(sampler_idx),
        source: image_idx,
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });

    if atlas.mime_type == "image/webp" {
        root.extensions_used.push("EXT_texture_webp".into());
    }

    let pbr = gltf_json::material::PbrMetallicRoughness {
        base_color_factor: gltf_json::material::PbrBaseColorFactor([1.0, 1.0, 1.0, 1.0]),
        metallic_factor: gltf_json::material::StrengthFactor(0.0),
        roughness_factor: gltf_json::material::StrengthFactor(1.0),
        base_color_texture: Some(gltf_json::texture::Info {
            index: texture_idx,
            tex_coord: 0,
            extensions: Default::default(),
            extras: Default::default(),
        }),
        metallic_roughness_texture: None,
        extensions: Default::default(),
        extras: Default::default(),
    };

    root.push(gltf_json::Material {
        pbr_metallic_roughness: pbr,
        alpha_mode: Checked::Valid(gltf_json::material::AlphaMode::Opaque),
        alpha_cutoff: None,
        double_sided: true,
        normal_texture: None,
        occlusion_texture: None,
        emissive_texture: None,
        emissive_factor: gltf_json::material::EmissiveFactor([0.0, 0.0, 0.0]),
        name: Some("atlas".into()),
        extensions: Default::default(),
        extras: Default::default(),
    })
}

fn assemble_glb(root: &gltf_json::Root, bin_data: Vec<u8>) -> Result<Vec<u8>> {
    let json_string = gltf_json::serialize::to_string(root)
        .map_err(|e| CityAtlasError::Output(format!("glTF JSON serialization failed: {e}")))?;
    let mut json_bytes = json_string.into_bytes();
    // GLB pads the JSON chunk with spaces
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }

    let bin_chunk = if bin_data.is_empty() {
        0
    } else {
        8 + bin_data.len()
    };
    let glb = Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: (12 + 8 + json_bytes.len() + bin_chunk) as u32,
        },
        json: Cow::Owned(json_bytes),
        bin: (!bin_data.is_empty()).then_some(Cow::Owned(bin_data)),
    };

    glb.to_vec()
        .map_err(|e| CityAtlasError::Output(format!("GLB serialization failed: {e}")))
}

fn pad_to_4(bin_data: &mut Vec<u8>) {
    while bin_data.len() % 4 != 0 {
        bin_data.push(0);
    }
}

/// Compute min/max for a flat positions array (stride 3).
fn compute_position_bounds(positions: &[f32]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];

    for chunk in positions.chunks_exact(3) {
        for i in 0..3 {
            min[i] = min[i].min(chunk[i]);
            max[i] = max[i].max(chunk[i]);
        }
    }

    (min, max)
}
