use std::io::{Read, Write};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::{Point3, Vector3, Vector4};

use crate::camera::TracerCamera;
use crate::tracer::bvh::aabb::BoundsBox;
use crate::tracer::error::SceneError;
use crate::tracer::scene::{Light, LightKind, Material, SceneFile, Triangle};

// the scene format is a straight native-endian field dump: scene bounds,
// camera, then length-prefixed material, triangle, and light arrays

fn read_vec3<R: Read>(reader: &mut R) -> Result<Vector3<f32>, SceneError> {
    Ok(Vector3::new(
        reader.read_f32::<NativeEndian>()?,
        reader.read_f32::<NativeEndian>()?,
        reader.read_f32::<NativeEndian>()?,
    ))
}

fn read_point3<R: Read>(reader: &mut R) -> Result<Point3<f32>, SceneError> {
    Ok(Point3::from(read_vec3(reader)?))
}

fn read_vec4<R: Read>(reader: &mut R) -> Result<Vector4<f32>, SceneError> {
    Ok(Vector4::new(
        reader.read_f32::<NativeEndian>()?,
        reader.read_f32::<NativeEndian>()?,
        reader.read_f32::<NativeEndian>()?,
        reader.read_f32::<NativeEndian>()?,
    ))
}

fn read_count<R: Read>(reader: &mut R, kind: &'static str) -> Result<usize, SceneError> {
    let value = reader.read_i32::<NativeEndian>()?;
    if value < 0 {
        return Err(SceneError::NegativeCount { kind, value });
    }
    Ok(value as usize)
}

pub fn decode_scene<R: Read>(reader: &mut R) -> Result<SceneFile, SceneError> {
    let bounds = BoundsBox::new(read_point3(reader)?, read_point3(reader)?);

    let camera = TracerCamera {
        position: read_point3(reader)?,
        forward: read_vec3(reader)?,
        right: read_vec3(reader)?,
        up: read_vec3(reader)?,
        horizontal_size: reader.read_f32::<NativeEndian>()?,
        fov: reader.read_f32::<NativeEndian>()?,
    };

    let material_count = read_count(reader, "material")?;
    let mut materials = Vec::with_capacity(material_count);
    for _ in 0..material_count {
        materials.push(Material {
            color: read_vec4(reader)?,
            roughness: reader.read_f32::<NativeEndian>()?,
            is_emissive: reader.read_u8()? != 0,
        });
    }

    let triangle_count = read_count(reader, "triangle")?;
    let mut triangles = Vec::with_capacity(triangle_count);
    for _ in 0..triangle_count {
        let positions = [
            read_point3(reader)?,
            read_point3(reader)?,
            read_point3(reader)?,
        ];
        let normals = [read_vec3(reader)?, read_vec3(reader)?, read_vec3(reader)?];
        let material_index = reader.read_i32::<NativeEndian>()? as u32;
        triangles.push(Triangle::new(positions, normals, material_index));
    }

    let light_count = read_count(reader, "light")?;
    let mut lights = Vec::with_capacity(light_count);
    for _ in 0..light_count {
        let color = read_vec4(reader)?;
        let position = read_point3(reader)?;
        let forward = read_vec3(reader)?;
        let range = reader.read_f32::<NativeEndian>()?;
        let intensity = reader.read_f32::<NativeEndian>()?;
        let angle = reader.read_f32::<NativeEndian>()?;
        let wire_kind = reader.read_i32::<NativeEndian>()?;
        let kind =
            LightKind::from_wire(wire_kind).ok_or(SceneError::UnknownLightKind(wire_kind))?;
        lights.push(Light {
            color,
            position,
            forward,
            range,
            intensity,
            angle,
            kind,
        });
    }

    Ok(SceneFile {
        bounds,
        camera,
        materials,
        triangles,
        lights,
    })
}

fn write_vec3<W: Write>(writer: &mut W, v: &Vector3<f32>) -> Result<(), SceneError> {
    writer.write_f32::<NativeEndian>(v.x)?;
    writer.write_f32::<NativeEndian>(v.y)?;
    writer.write_f32::<NativeEndian>(v.z)?;
    Ok(())
}

fn write_point3<W: Write>(writer: &mut W, p: &Point3<f32>) -> Result<(), SceneError> {
    write_vec3(writer, &p.coords)
}

fn write_vec4<W: Write>(writer: &mut W, v: &Vector4<f32>) -> Result<(), SceneError> {
    writer.write_f32::<NativeEndian>(v.x)?;
    writer.write_f32::<NativeEndian>(v.y)?;
    writer.write_f32::<NativeEndian>(v.z)?;
    writer.write_f32::<NativeEndian>(v.w)?;
    Ok(())
}

pub fn encode_scene<W: Write>(writer: &mut W, scene: &SceneFile) -> Result<(), SceneError> {
    write_point3(writer, &scene.bounds.min)?;
    write_point3(writer, &scene.bounds.max)?;

    write_point3(writer, &scene.camera.position)?;
    write_vec3(writer, &scene.camera.forward)?;
    write_vec3(writer, &scene.camera.right)?;
    write_vec3(writer, &scene.camera.up)?;
    writer.write_f32::<NativeEndian>(scene.camera.horizontal_size)?;
    writer.write_f32::<NativeEndian>(scene.camera.fov)?;

    writer.write_i32::<NativeEndian>(scene.materials.len() as i32)?;
    for material in &scene.materials {
        write_vec4(writer, &material.color)?;
        writer.write_f32::<NativeEndian>(material.roughness)?;
        writer.write_u8(material.is_emissive as u8)?;
    }

    writer.write_i32::<NativeEndian>(scene.triangles.len() as i32)?;
    for triangle in &scene.triangles {
        write_point3(writer, &triangle.pos_a)?;
        write_point3(writer, &triangle.pos_b)?;
        write_point3(writer, &triangle.pos_c)?;
        write_vec3(writer, &triangle.normal_a)?;
        write_vec3(writer, &triangle.normal_b)?;
        write_vec3(writer, &triangle.normal_c)?;
        writer.write_i32::<NativeEndian>(triangle.material_index as i32)?;
    }

    writer.write_i32::<NativeEndian>(scene.lights.len() as i32)?;
    for light in &scene.lights {
        write_vec4(writer, &light.color)?;
        write_point3(writer, &light.position)?;
        write_vec3(writer, &light.forward)?;
        writer.write_f32::<NativeEndian>(light.range)?;
        writer.write_f32::<NativeEndian>(light.intensity)?;
        writer.write_f32::<NativeEndian>(light.angle)?;
        writer.write_i32::<NativeEndian>(light.kind.to_wire())?;
    }

    Ok(())
}
